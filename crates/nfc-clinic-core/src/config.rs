//! Workstation configuration, read from the environment.
//!
//! Variables:
//! - `CLINIC_DB_PATH`: SQLite database file (default: `healthcare.db`)
//! - `CLINIC_NFC_DEVICE`: raw identity reader device (default: `/dev/hidraw0`)
//! - `CLINIC_POLL_INTERVAL_MS`: delay between failed reads (default: 2000)
//! - `CLINIC_READ_LEN`: bytes requested per read (default: 16)
//! - `CLINIC_UID_LEN`: leading bytes that form the UID (default: 4)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("UID length {uid_len} must be between 1 and the read length {read_len}")]
    UidLength { uid_len: usize, read_len: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClinicConfig {
    pub database_path: PathBuf,
    pub identity_device: PathBuf,
    pub poll_interval: Duration,
    pub read_len: usize,
    pub uid_len: usize,
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("healthcare.db"),
            identity_device: PathBuf::from("/dev/hidraw0"),
            poll_interval: Duration::from_secs(2),
            read_len: 16,
            uid_len: 4,
        }
    }
}

impl ClinicConfig {
    /// Build from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup("CLINIC_DB_PATH") {
            config.database_path = PathBuf::from(path);
        }
        if let Some(device) = lookup("CLINIC_NFC_DEVICE") {
            config.identity_device = PathBuf::from(device);
        }
        if let Some(ms) = parse_number(&lookup, "CLINIC_POLL_INTERVAL_MS")? {
            config.poll_interval = Duration::from_millis(ms as u64);
        }
        if let Some(len) = parse_number(&lookup, "CLINIC_READ_LEN")? {
            config.read_len = len;
        }
        if let Some(len) = parse_number(&lookup, "CLINIC_UID_LEN")? {
            config.uid_len = len;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.uid_len == 0 || self.uid_len > self.read_len {
            return Err(ConfigError::UidLength {
                uid_len: self.uid_len,
                read_len: self.read_len,
            });
        }
        Ok(())
    }
}

fn parse_number<F>(lookup: &F, key: &'static str) -> Result<Option<usize>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}
