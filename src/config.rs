//! Workload Configuration Module
//!
//! All numeric knobs of a run live in [`Settings`], supplied once before the
//! engine starts and never re-read.
//!
//! # Design Philosophy
//!
//! Configuration structs have all public fields for simple instantiation:
//!
//! - **Simple**: Start from `Settings::default()` and override what you need
//! - **Checked once**: [`Settings::validate`] rejects impossible combinations up front
//! - **Immutable afterwards**: the engine shares a validated copy behind an `Arc`
//!
//! # Rate Function
//!
//! The scheduler admits one unit of work every
//!
//! ```text
//! delay_ms = 1000 / (rate_slope * d(t) + rate_intercept)
//! d(t)     = -cos(2π · elapsed_ms / (diurnal_period_hours · 3_600_000)) + 1.5
//! ```
//!
//! so `rate_slope` scales the swing of the diurnal curve and `rate_intercept`
//! lifts its floor. With the defaults (`1.0`, `0.0`) the admission rate moves
//! between 0.5/s and 2.5/s over one day.
//!
//! # Examples
//!
//! ```
//! use workhorse::config::Settings;
//!
//! let settings = Settings {
//!     min_list_size: 100,
//!     max_list_size: 1_000,
//!     hot_probability: 50,
//!     ..Settings::default()
//! };
//! assert!(settings.validate().is_ok());
//! ```

use std::time::Duration;

use crate::cache::{CacheKind, MapRetention};
use crate::error::{Error, Result};

/// Worker pool, cache layout and reproducibility knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolSettings {
    /// Upper bound on live worker threads; admission beyond it is rejected.
    pub max_workers: usize,
    /// How long an idle worker waits for a new unit before retiring.
    pub keep_alive: Duration,
    /// How long shutdown waits for running units before abandoning them.
    pub shutdown_grace: Duration,
    /// Seed for the shared generator; `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Implementation behind the hot and cold pools.
    pub cache_kind: CacheKind,
    /// Lock segments per pool when `cache_kind` is sharded.
    pub cache_segments: usize,
    /// Eviction and expiry applied when `cache_kind` is map.
    pub map_retention: MapRetention,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_workers: 4096,
            keep_alive: Duration::from_secs(60),
            shutdown_grace: Duration::from_secs(5),
            seed: None,
            cache_kind: CacheKind::Bounded,
            cache_segments: 16,
            map_retention: MapRetention::default(),
        }
    }
}

/// Immutable parameters of a workload run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Slope `M` of the admission rate function.
    pub rate_slope: f64,
    /// Intercept `B` of the admission rate function.
    pub rate_intercept: f64,
    /// Hours before the diurnal curve repeats.
    pub diurnal_period_hours: f64,
    /// Smallest list a worker sorts.
    pub min_list_size: usize,
    /// Largest list a worker sorts.
    pub max_list_size: usize,
    /// Fewest partitions a list is divided into.
    pub min_partitions: usize,
    /// Most partitions a list is divided into.
    pub max_partitions: usize,
    /// Percentage (0-100) of finished lists retained in the hot pool.
    pub hot_probability: u8,
    /// Percentage (0-100) of finished lists retained in the cold pool.
    pub cold_probability: u8,
    /// Slots in the hot pool.
    pub hot_cache_size: usize,
    /// Slots in the cold pool.
    pub cold_cache_size: usize,
    /// Milliseconds a worker sleeps when it decides to block.
    pub worker_sleep_ms: u64,
    /// Percentage (0-100) that a worker sleeps after a partition.
    pub sleep_probability: u8,
    /// Worker pool and cache layout.
    pub pool: PoolSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rate_slope: 1.0,
            rate_intercept: 0.0,
            diurnal_period_hours: 24.0,
            min_list_size: 10_000,
            max_list_size: 1_000_000,
            min_partitions: 10,
            max_partitions: 1000,
            hot_probability: 30,
            cold_probability: 10,
            hot_cache_size: 1000,
            cold_cache_size: 1000,
            worker_sleep_ms: 1000,
            sleep_probability: 5,
            pool: PoolSettings::default(),
        }
    }
}

impl Settings {
    /// Checks every invariant the engine relies on.
    ///
    /// Returns the first violation as [`Error::InvalidArgument`], naming the
    /// offending field.
    pub fn validate(&self) -> Result<()> {
        if !self.rate_slope.is_finite() {
            return Err(Error::invalid_argument("rate_slope must be finite"));
        }
        if !self.rate_intercept.is_finite() {
            return Err(Error::invalid_argument("rate_intercept must be finite"));
        }
        if !(self.diurnal_period_hours.is_finite() && self.diurnal_period_hours > 0.0) {
            return Err(Error::invalid_argument(format!(
                "diurnal_period_hours must be positive, got {}",
                self.diurnal_period_hours
            )));
        }
        if self.max_list_size == 0 {
            return Err(Error::invalid_argument("max_list_size must be positive"));
        }
        check_bounds("list_size", self.min_list_size, self.max_list_size)?;
        if self.min_partitions == 0 {
            return Err(Error::invalid_argument("min_partitions must be positive"));
        }
        check_bounds("partitions", self.min_partitions, self.max_partitions)?;
        check_percentage("hot_probability", self.hot_probability)?;
        check_percentage("cold_probability", self.cold_probability)?;
        check_percentage("sleep_probability", self.sleep_probability)?;
        if u16::from(self.hot_probability) + u16::from(self.cold_probability) > 100 {
            return Err(Error::invalid_argument(format!(
                "hot_probability + cold_probability must not exceed 100, got {} + {}",
                self.hot_probability, self.cold_probability
            )));
        }
        if self.hot_cache_size == 0 {
            return Err(Error::invalid_argument("hot_cache_size must be positive"));
        }
        if self.cold_cache_size == 0 {
            return Err(Error::invalid_argument("cold_cache_size must be positive"));
        }
        if self.pool.max_workers == 0 {
            return Err(Error::invalid_argument("max_workers must be positive"));
        }
        if self.pool.cache_segments == 0 {
            return Err(Error::invalid_argument("cache_segments must be positive"));
        }
        self.pool.map_retention.validate()
    }

    /// The simulated I/O pause as a [`Duration`].
    pub fn worker_sleep(&self) -> Duration {
        Duration::from_millis(self.worker_sleep_ms)
    }
}

fn check_bounds(name: &str, min: usize, max: usize) -> Result<()> {
    if min > max {
        return Err(Error::invalid_argument(format!(
            "min_{name} ({min}) must not exceed max_{name} ({max})"
        )));
    }
    Ok(())
}

fn check_percentage(name: &str, value: u8) -> Result<()> {
    if value > 100 {
        return Err(Error::invalid_argument(format!(
            "{name} must be within 0..=100, got {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invalid(settings: Settings, needle: &str) {
        match settings.validate() {
            Err(Error::InvalidArgument { detail }) => {
                assert!(detail.contains(needle), "{detail} should mention {needle}")
            }
            other => panic!("expected InvalidArgument mentioning {needle}, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(Settings::default().validate(), Ok(()));
    }

    #[test]
    fn test_inverted_bounds() {
        assert_invalid(
            Settings {
                min_list_size: 10,
                max_list_size: 5,
                ..Settings::default()
            },
            "list_size",
        );
        assert_invalid(
            Settings {
                min_partitions: 20,
                max_partitions: 5,
                ..Settings::default()
            },
            "partitions",
        );
    }

    #[test]
    fn test_zero_sizes() {
        assert_invalid(
            Settings {
                min_list_size: 0,
                max_list_size: 0,
                ..Settings::default()
            },
            "max_list_size",
        );
        assert_invalid(
            Settings {
                min_partitions: 0,
                ..Settings::default()
            },
            "min_partitions",
        );
        assert_invalid(
            Settings {
                hot_cache_size: 0,
                ..Settings::default()
            },
            "hot_cache_size",
        );
    }

    #[test]
    fn test_probabilities() {
        assert_invalid(
            Settings {
                sleep_probability: 101,
                ..Settings::default()
            },
            "sleep_probability",
        );
        assert_invalid(
            Settings {
                hot_probability: 70,
                cold_probability: 40,
                ..Settings::default()
            },
            "must not exceed 100",
        );
        let edge = Settings {
            hot_probability: 60,
            cold_probability: 40,
            ..Settings::default()
        };
        assert_eq!(edge.validate(), Ok(()));
    }

    #[test]
    fn test_period_and_rates() {
        assert_invalid(
            Settings {
                diurnal_period_hours: 0.0,
                ..Settings::default()
            },
            "diurnal_period_hours",
        );
        assert_invalid(
            Settings {
                rate_slope: f64::NAN,
                ..Settings::default()
            },
            "rate_slope",
        );
    }

    #[test]
    fn test_pool_settings() {
        let mut settings = Settings::default();
        settings.pool.max_workers = 0;
        assert_invalid(settings, "max_workers");

        let mut settings = Settings::default();
        settings.pool.map_retention.time_to_live = Some(Duration::ZERO);
        assert_invalid(settings, "time_to_live");

        let mut settings = Settings::default();
        settings.pool.map_retention.max_entries = Some(0);
        assert_invalid(settings, "max_entries");
    }

    #[test]
    fn test_min_list_size_zero_allowed() {
        let settings = Settings {
            min_list_size: 0,
            ..Settings::default()
        };
        assert_eq!(settings.validate(), Ok(()));
    }
}
