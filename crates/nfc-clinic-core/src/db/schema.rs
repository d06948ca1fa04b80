//! SQLite schema definition.
//!
//! Table and column names are shared with existing workstation databases
//! and must not change.

/// Complete database schema.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Patients (one row per tag UID, replaced wholesale on save)
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    uid TEXT PRIMARY KEY,
    doctor_name TEXT, patient_name TEXT, patient_number TEXT,
    patient_address TEXT, diagnosis TEXT, past_treatment TEXT,
    medications TEXT, prescription TEXT
);

-- ============================================================================
-- Email Logs (Append-Only)
-- ============================================================================

CREATE TABLE IF NOT EXISTS email_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uid TEXT, email TEXT, sent_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_email_logs_sent_at ON email_logs(sent_at);

-- ============================================================================
-- Medication History (append, or delete by exact match)
-- ============================================================================

CREATE TABLE IF NOT EXISTS medication_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uid TEXT,
    disease TEXT,
    timestamp TEXT
);

CREATE INDEX IF NOT EXISTS idx_medication_uid_ts ON medication_history(uid, timestamp);
"#;
