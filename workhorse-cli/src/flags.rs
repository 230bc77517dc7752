// Command-line flags for the workhorse binary

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use clap::{CommandFactory, Parser};
use tracing::debug;
use workhorse::cache::{CacheKind, MapRetention};
use workhorse::config::{PoolSettings, Settings};
use workhorse::error::{Error, Result};

/// Synthetic diurnal workload generator
#[derive(Parser, Debug, Clone)]
#[command(name = "workhorse", author, version, about, long_about = None)]
pub struct Flags {
    /// Slope M of the admission rate function
    #[arg(
        long = "rate-slope-constant",
        visible_alias = "rsc",
        default_value_t = 1.0,
        allow_negative_numbers = true
    )]
    pub rate_slope: f64,

    /// Intercept B of the admission rate function
    #[arg(
        long = "rate-intercept-constant",
        visible_alias = "ric",
        default_value_t = 0.0,
        allow_negative_numbers = true
    )]
    pub rate_intercept: f64,

    /// Hours before the diurnal curve repeats
    #[arg(long = "diurnal-period", visible_alias = "dp", default_value_t = 24.0)]
    pub diurnal_period_hours: f64,

    /// Largest list a worker sorts
    #[arg(long, visible_alias = "mxls", default_value_t = 1_000_000)]
    pub max_list_size: usize,

    /// Smallest list a worker sorts
    #[arg(long, visible_alias = "mnls", default_value_t = 10_000)]
    pub min_list_size: usize,

    /// Most partitions a list is divided into
    #[arg(long = "max-number-of-list-partitions", visible_alias = "mxnolp", default_value_t = 1000)]
    pub max_partitions: usize,

    /// Fewest partitions a list is divided into
    #[arg(long = "min-number-of-list-partitions", visible_alias = "mnnolp", default_value_t = 10)]
    pub min_partitions: usize,

    /// Percentage of finished lists kept in the hot pool
    #[arg(long, visible_alias = "hp", default_value_t = 30)]
    pub hot_probability: u8,

    /// Slots in the hot pool
    #[arg(long, visible_alias = "hcs", default_value_t = 1000)]
    pub hot_cache_size: usize,

    /// Percentage of finished lists kept in the cold pool
    #[arg(long, visible_alias = "cp", default_value_t = 10)]
    pub cold_probability: u8,

    /// Slots in the cold pool
    #[arg(long, visible_alias = "ccs", default_value_t = 1000)]
    pub cold_cache_size: usize,

    /// Milliseconds a worker sleeps when it blocks between partitions
    #[arg(long = "worker-sleep-time", visible_alias = "wst", default_value_t = 1000)]
    pub worker_sleep_ms: u64,

    /// Percentage chance a worker blocks after a partition
    #[arg(long, visible_alias = "sp", default_value_t = 5)]
    pub sleep_probability: u8,

    /// Log filter (error, warn, info, debug, trace or a tracing directive)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Stop after this many seconds; runs until killed when absent
    #[arg(long, value_name = "SECS")]
    pub run_for_secs: Option<u64>,

    /// Seed for the shared generator (entropy when absent)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Upper bound on live worker threads
    #[arg(long, default_value_t = 4096)]
    pub max_workers: usize,

    /// Seconds an idle worker waits for work before retiring
    #[arg(long, default_value_t = 60)]
    pub keep_alive_secs: u64,

    /// Milliseconds shutdown waits for running units
    #[arg(long, default_value_t = 5000)]
    pub shutdown_grace_ms: u64,

    /// Retention pool implementation (bounded, sharded, map)
    #[arg(long, default_value_t = CacheKind::Bounded)]
    pub cache_kind: CacheKind,

    /// Lock segments per pool for the sharded implementation
    #[arg(long, default_value_t = 16)]
    pub cache_segments: usize,

    /// Entries the map pool keeps before evicting; its slot count when absent
    #[arg(long, value_name = "ENTRIES")]
    pub map_max_entries: Option<u64>,

    /// Milliseconds after a write before a map pool entry expires
    #[arg(long, value_name = "MS")]
    pub map_ttl_ms: Option<u64>,

    /// Milliseconds after the last access before a map pool entry expires
    #[arg(long, value_name = "MS")]
    pub map_tti_ms: Option<u64>,

    /// Milliseconds between metric samples
    #[arg(long, default_value_t = 10_000)]
    pub metrics_interval_ms: u64,

    /// Write metric samples to this CSV file instead of the log
    #[arg(long, value_name = "PATH")]
    pub metrics_csv: Option<PathBuf>,

    /// Reject unrecognized flags instead of ignoring them
    #[arg(long)]
    pub strict_flags: bool,
}

impl Flags {
    /// Converts parsed flags into engine settings. Validation happens later.
    pub fn to_settings(&self) -> Settings {
        Settings {
            rate_slope: self.rate_slope,
            rate_intercept: self.rate_intercept,
            diurnal_period_hours: self.diurnal_period_hours,
            min_list_size: self.min_list_size,
            max_list_size: self.max_list_size,
            min_partitions: self.min_partitions,
            max_partitions: self.max_partitions,
            hot_probability: self.hot_probability,
            cold_probability: self.cold_probability,
            hot_cache_size: self.hot_cache_size,
            cold_cache_size: self.cold_cache_size,
            worker_sleep_ms: self.worker_sleep_ms,
            sleep_probability: self.sleep_probability,
            pool: PoolSettings {
                max_workers: self.max_workers,
                keep_alive: Duration::from_secs(self.keep_alive_secs),
                shutdown_grace: Duration::from_millis(self.shutdown_grace_ms),
                seed: self.seed,
                cache_kind: self.cache_kind,
                cache_segments: self.cache_segments,
                map_retention: MapRetention {
                    max_entries: self.map_max_entries,
                    time_to_live: self.map_ttl_ms.map(Duration::from_millis),
                    time_to_idle: self.map_tti_ms.map(Duration::from_millis),
                },
            },
        }
    }

    /// The processor selected by `--strict-flags`.
    pub fn supplemental_processor(&self) -> Box<dyn SupplementalSettingsProcessor> {
        if self.strict_flags {
            Box::new(StrictSupplementalSettingsProcessor)
        } else {
            Box::new(NullSupplementalSettingsProcessor)
        }
    }
}

/// Arguments sorted into those [`Flags`] understands and the rest.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SplitArguments {
    /// Tokens to hand to clap.
    pub known: Vec<String>,
    /// Tokens for the supplemental processor.
    pub supplemental: Vec<String>,
}

/// Long names and aliases of every flag, mapped to whether the flag takes a value.
fn known_flags() -> HashMap<String, bool> {
    let mut command = Flags::command();
    command.build();
    let mut table = HashMap::new();
    for arg in command.get_arguments() {
        let takes_value = arg.get_action().takes_values();
        if let Some(long) = arg.get_long() {
            table.insert(long.to_string(), takes_value);
        }
        for alias in arg.get_all_aliases().unwrap_or_default() {
            table.insert(alias.to_string(), takes_value);
        }
    }
    table
}

/// Splits raw arguments (without the program name).
///
/// A `--name` or `--name=value` token goes to `known` when `name` is a flag
/// or alias of [`Flags`], to `supplemental` otherwise; a following value token
/// travels with it. Single-dash tokens go to clap. Stray positionals and
/// everything after a bare `--` are supplemental.
pub fn split_arguments<I, S>(args: I) -> SplitArguments
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let table = known_flags();
    let mut split = SplitArguments::default();
    let mut tokens = args.into_iter().map(Into::into).peekable();

    while let Some(token) = tokens.next() {
        let Some(body) = token.strip_prefix("--") else {
            if token.starts_with('-') && token.len() > 1 {
                split.known.push(token);
            } else {
                split.supplemental.push(token);
            }
            continue;
        };
        if body.is_empty() {
            split.supplemental.extend(tokens.by_ref());
            break;
        }

        let (name, inline_value) = match body.split_once('=') {
            Some((name, _)) => (name, true),
            None => (body, false),
        };
        let (destination, takes_value) = match table.get(name) {
            Some(&takes_value) => (&mut split.known, takes_value),
            None => (&mut split.supplemental, true),
        };
        destination.push(token.clone());
        if takes_value && !inline_value {
            if let Some(value) = tokens.next_if(|next| !next.starts_with("--")) {
                destination.push(value);
            }
        }
    }
    split
}

/// Receives the arguments [`Flags`] does not recognize.
pub trait SupplementalSettingsProcessor {
    /// Accepts or rejects the leftover tokens.
    fn process(&self, args: &[String]) -> Result<()>;
}

/// Ignores leftover tokens.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSupplementalSettingsProcessor;

impl SupplementalSettingsProcessor for NullSupplementalSettingsProcessor {
    fn process(&self, args: &[String]) -> Result<()> {
        if !args.is_empty() {
            debug!(?args, "ignoring unrecognized arguments");
        }
        Ok(())
    }
}

/// Rejects any leftover token.
#[derive(Debug, Default, Clone, Copy)]
pub struct StrictSupplementalSettingsProcessor;

impl SupplementalSettingsProcessor for StrictSupplementalSettingsProcessor {
    fn process(&self, args: &[String]) -> Result<()> {
        if args.is_empty() {
            return Ok(());
        }
        Err(Error::invalid_argument(format!(
            "unrecognized arguments: {}",
            args.join(" ")
        )))
    }
}
