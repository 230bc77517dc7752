// Workhorse command-line driver library

pub mod driver;
pub mod exporter;
pub mod flags;
