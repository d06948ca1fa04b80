//! Audit trail models: email deliveries and medication history.

use chrono::{NaiveDateTime, SubsecRound};
use serde::{Deserialize, Serialize};

/// Persisted format for medication timestamps (second resolution).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Persisted format for email delivery times (microsecond resolution).
pub const SENT_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Accepts both persisted forms; the fraction is optional.
const PARSE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// A record of one successful report delivery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmailLogEntry {
    pub id: i64,
    pub uid: String,
    /// Recipient address
    pub email: String,
    pub sent_at: NaiveDateTime,
}

/// One disease/treatment line in a patient's medication history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MedicationHistoryEntry {
    pub id: i64,
    pub uid: String,
    pub disease: String,
    /// Whole-second timestamp; part of the exact-match delete key
    pub timestamp: NaiveDateTime,
}

/// Truncate to the resolution medication timestamps are stored at.
pub fn to_history_resolution(ts: NaiveDateTime) -> NaiveDateTime {
    ts.trunc_subsecs(0)
}

pub fn format_history_timestamp(ts: &NaiveDateTime) -> String {
    to_history_resolution(*ts).format(TIMESTAMP_FORMAT).to_string()
}

pub fn format_sent_at(ts: &NaiveDateTime) -> String {
    ts.format(SENT_AT_FORMAT).to_string()
}

/// Normalize a recipient address, rejecting empty or obviously malformed input.
pub fn normalize_email(email: &str) -> Result<String, String> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Err("Recipient email must not be empty".into());
    }
    if !trimmed.contains('@') {
        return Err(format!("Recipient email is malformed: {}", trimmed));
    }
    Ok(trimmed.to_string())
}

pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s.trim(), PARSE_FORMAT)
}
