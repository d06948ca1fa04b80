//! NFC Clinic Core Library
//!
//! Tag-indexed patient records for a clinic workstation, with append-only
//! audit trails and a background reader that races with interactive edits.
//!
//! # Architecture
//!
//! ```text
//!   identity reader (/dev/hidraw0)
//!              │ raw bytes
//!              ▼
//!   ┌────────────────────┐  UidDetected{seq}  ┌──────────────────────┐
//!   │  Identity Poller   │ ─────────────────▶ │  Session Controller  │
//!   │ (background thread)│    mpsc queue      │ (interactive thread) │
//!   └────────────────────┘                    └──────────┬───────────┘
//!                                                        │ get / upsert
//!                                             ┌──────────▼───────────┐
//!                                             │   SQLite database    │
//!                                             │ patients │ email_logs│
//!                                             │ medication_history   │
//!                                             └──────────────────────┘
//! ```
//!
//! # Core Principle
//!
//! **Only the interactive thread mutates the form.** Background work posts
//! messages; stale loads (older than the last save of the same tag) are
//! discarded.
//!
//! # Modules
//!
//! - [`db`]: Record Store and Audit Log over SQLite
//! - [`models`]: Domain types (PatientRecord, EmailLogEntry, MedicationHistoryEntry)
//! - [`identity`]: Identity Poller, sources, cancellation
//! - [`session`]: Session Controller, form model, cross-thread handle
//! - [`config`]: Environment configuration
//! - [`logging`]: Tracing subscriber setup

pub mod config;
pub mod db;
pub mod identity;
pub mod logging;
pub mod models;
pub mod session;

// Re-export commonly used types
pub use config::{ClinicConfig, ConfigError};
pub use db::{Database, DbError, SharedDatabase};
pub use identity::{
    CancelToken, DeviceSource, IdentityPoller, IdentitySource, PollerHandle, PollerOutcome,
    PollerState, UidSink,
};
pub use models::{
    EmailLogEntry, MedicationHistoryEntry, PatientField, PatientFields, PatientRecord,
};
pub use session::{FormModel, LoadOutcome, SessionController, SessionError, SessionHandle};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::Arc;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum ClinicError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<db::DbError> for ClinicError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::Validation(msg) => ClinicError::InvalidInput(msg),
            other => ClinicError::DatabaseError(other.to_string()),
        }
    }
}

impl From<chrono::ParseError> for ClinicError {
    fn from(e: chrono::ParseError) -> Self {
        ClinicError::InvalidInput(format!("Bad timestamp: {}", e))
    }
}

impl<T> From<std::sync::PoisonError<T>> for ClinicError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        ClinicError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<ClinicCore>, ClinicError> {
    let db = Database::open(&path)?;
    Ok(Arc::new(ClinicCore {
        db: db::shared(db),
    }))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<ClinicCore>, ClinicError> {
    let db = Database::open_in_memory()?;
    Ok(Arc::new(ClinicCore {
        db: db::shared(db),
    }))
}

/// Install the default tracing subscriber. Returns false if one already exists.
#[uniffi::export]
pub fn init_logging() -> bool {
    logging::init()
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe database wrapper for FFI.
#[derive(uniffi::Object)]
pub struct ClinicCore {
    db: SharedDatabase,
}

impl ClinicCore {
    /// Shared handle for in-process collaborators (session, mailer).
    pub fn shared_database(&self) -> SharedDatabase {
        Arc::clone(&self.db)
    }
}

#[uniffi::export]
impl ClinicCore {
    // =========================================================================
    // Record Store
    // =========================================================================

    /// Save a full patient record, replacing any existing one.
    pub fn upsert_patient(&self, record: FfiPatientRecord) -> Result<(), ClinicError> {
        let db = self.db.lock()?;
        db.upsert_patient(&record.into())?;
        Ok(())
    }

    /// Get a patient record by UID.
    pub fn get_patient(&self, uid: String) -> Result<Option<FfiPatientRecord>, ClinicError> {
        let db = self.db.lock()?;
        let record = db.get_patient(&uid)?;
        Ok(record.map(|r| r.into()))
    }

    // =========================================================================
    // Audit Log
    // =========================================================================

    /// Record a delivery made now.
    pub fn append_email_log(&self, uid: String, email: String) -> Result<i64, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.append_email_log(&uid, &email, chrono::Local::now().naive_local())?)
    }

    /// All deliveries, most recent first.
    pub fn list_email_logs(&self) -> Result<Vec<FfiEmailLogEntry>, ClinicError> {
        let db = self.db.lock()?;
        let logs = db.list_email_logs()?;
        Ok(logs.into_iter().map(|l| l.into()).collect())
    }

    /// Add a medication history entry stamped now.
    pub fn add_medication_entry(&self, uid: String, disease: String) -> Result<i64, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.append_medication_entry(&uid, &disease, chrono::Local::now().naive_local())?)
    }

    /// Medication history for a patient, newest first.
    pub fn list_medication_entries(
        &self,
        uid: String,
    ) -> Result<Vec<FfiMedicationEntry>, ClinicError> {
        let db = self.db.lock()?;
        let entries = db.list_medication_entries(&uid)?;
        Ok(entries.into_iter().map(|e| e.into()).collect())
    }

    /// Remove one entry by its displayed values (lowest id on duplicates).
    pub fn delete_medication_entry(
        &self,
        uid: String,
        disease: String,
        timestamp: String,
    ) -> Result<u32, ClinicError> {
        let timestamp = models::parse_timestamp(&timestamp)?;
        let db = self.db.lock()?;
        Ok(db.delete_medication_entry(&uid, &disease, timestamp)? as u32)
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe patient record.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientRecord {
    pub uid: String,
    pub doctor_name: String,
    pub patient_name: String,
    pub patient_number: String,
    pub patient_address: String,
    pub diagnosis: String,
    pub past_treatment: String,
    pub medications: String,
    pub prescription: String,
}

impl From<PatientRecord> for FfiPatientRecord {
    fn from(record: PatientRecord) -> Self {
        let f = record.fields;
        Self {
            uid: record.uid,
            doctor_name: f.doctor_name,
            patient_name: f.patient_name,
            patient_number: f.patient_number,
            patient_address: f.patient_address,
            diagnosis: f.diagnosis,
            past_treatment: f.past_treatment,
            medications: f.medications,
            prescription: f.prescription,
        }
    }
}

impl From<FfiPatientRecord> for PatientRecord {
    fn from(record: FfiPatientRecord) -> Self {
        PatientRecord {
            uid: record.uid,
            fields: PatientFields {
                doctor_name: record.doctor_name,
                patient_name: record.patient_name,
                patient_number: record.patient_number,
                patient_address: record.patient_address,
                diagnosis: record.diagnosis,
                past_treatment: record.past_treatment,
                medications: record.medications,
                prescription: record.prescription,
            },
        }
    }
}

/// FFI-safe email log entry.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiEmailLogEntry {
    pub id: i64,
    pub uid: String,
    pub email: String,
    pub sent_at: String,
}

impl From<EmailLogEntry> for FfiEmailLogEntry {
    fn from(entry: EmailLogEntry) -> Self {
        Self {
            id: entry.id,
            uid: entry.uid,
            email: entry.email,
            sent_at: models::format_sent_at(&entry.sent_at),
        }
    }
}

/// FFI-safe medication history entry.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedicationEntry {
    pub id: i64,
    pub uid: String,
    pub disease: String,
    /// Second-resolution timestamp, as shown and as passed back for deletion
    pub timestamp: String,
}

impl From<MedicationHistoryEntry> for FfiMedicationEntry {
    fn from(entry: MedicationHistoryEntry) -> Self {
        Self {
            id: entry.id,
            uid: entry.uid,
            disease: entry.disease,
            timestamp: models::format_history_timestamp(&entry.timestamp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ffi_patient_roundtrip() {
        let core = open_database_in_memory().unwrap();
        let record = FfiPatientRecord {
            uid: "1A2B3C4D".into(),
            doctor_name: "Dr. Rao".into(),
            patient_name: "Jane Doe".into(),
            patient_number: "".into(),
            patient_address: "".into(),
            diagnosis: "Flu".into(),
            past_treatment: "".into(),
            medications: "".into(),
            prescription: "".into(),
        };
        core.upsert_patient(record).unwrap();

        let loaded = core.get_patient("1A2B3C4D".into()).unwrap().unwrap();
        assert_eq!(loaded.patient_name, "Jane Doe");
        assert!(core.get_patient("FFFFFFFF".into()).unwrap().is_none());
    }

    #[test]
    fn test_ffi_validation_maps_to_invalid_input() {
        let core = open_database_in_memory().unwrap();
        let err = core.get_patient("".into()).unwrap_err();
        assert!(matches!(err, ClinicError::InvalidInput(_)));
    }

    #[test]
    fn test_ffi_medication_delete_with_listed_timestamp() {
        let core = open_database_in_memory().unwrap();
        core.add_medication_entry("1A2B3C4D".into(), "Flu".into()).unwrap();

        let listed = core.list_medication_entries("1A2B3C4D".into()).unwrap();
        assert_eq!(listed.len(), 1);

        let removed = core
            .delete_medication_entry(
                "1A2B3C4D".into(),
                listed[0].disease.clone(),
                listed[0].timestamp.clone(),
            )
            .unwrap();
        assert_eq!(removed, 1);
        assert!(core.list_medication_entries("1A2B3C4D".into()).unwrap().is_empty());
    }

    #[test]
    fn test_ffi_email_logs() {
        let core = open_database_in_memory().unwrap();
        core.append_email_log("1A2B3C4D".into(), "doc@example.org".into())
            .unwrap();
        let logs = core.list_email_logs().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].email, "doc@example.org");
    }

    #[test]
    fn test_ffi_bad_timestamp() {
        let core = open_database_in_memory().unwrap();
        let err = core
            .delete_medication_entry("1A2B3C4D".into(), "Flu".into(), "noon".into())
            .unwrap_err();
        assert!(matches!(err, ClinicError::InvalidInput(_)));
    }
}
