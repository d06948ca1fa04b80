//! Audit Log: email delivery log and medication history.
//!
//! Both tables only ever grow, except for exact-match removal of a single
//! medication entry. Nothing is updated in place.

use chrono::NaiveDateTime;
use rusqlite::params;

use super::{timestamp_column, Database, DbError, DbResult};
use crate::models::{
    format_history_timestamp, format_sent_at, normalize_email, normalize_uid,
    to_history_resolution, EmailLogEntry, MedicationHistoryEntry,
};

fn validate_disease(disease: &str) -> DbResult<String> {
    let trimmed = disease.trim();
    if trimmed.is_empty() {
        return Err(DbError::Validation("Disease/treatment must not be empty".into()));
    }
    Ok(trimmed.to_string())
}

fn email_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EmailLogEntry> {
    Ok(EmailLogEntry {
        id: row.get(0)?,
        uid: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        email: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        sent_at: timestamp_column(row, 3)?,
    })
}

impl Database {
    // =========================================================================
    // Email Logs
    // =========================================================================

    /// Record a successful delivery. Returns the new entry's id.
    pub fn append_email_log(
        &self,
        uid: &str,
        email: &str,
        sent_at: NaiveDateTime,
    ) -> DbResult<i64> {
        let uid = normalize_uid(uid).map_err(DbError::Validation)?;
        let email = normalize_email(email).map_err(DbError::Validation)?;
        self.conn.execute(
            "INSERT INTO email_logs (uid, email, sent_at) VALUES (?1, ?2, ?3)",
            params![uid, email, format_sent_at(&sent_at)],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, uid = %uid, "email delivery logged");
        Ok(id)
    }

    /// All deliveries, most recent first.
    pub fn list_email_logs(&self) -> DbResult<Vec<EmailLogEntry>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, uid, email, sent_at
            FROM email_logs
            ORDER BY sent_at DESC, id DESC
            "#,
        )?;
        let rows = stmt.query_map([], email_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Deliveries for one patient, most recent first.
    pub fn list_email_logs_for(&self, uid: &str) -> DbResult<Vec<EmailLogEntry>> {
        let uid = normalize_uid(uid).map_err(DbError::Validation)?;
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, uid, email, sent_at
            FROM email_logs
            WHERE uid = ?
            ORDER BY sent_at DESC, id DESC
            "#,
        )?;
        let rows = stmt.query_map([uid], email_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // =========================================================================
    // Medication History
    // =========================================================================

    /// Add a history entry. The timestamp is stored at whole-second resolution.
    pub fn append_medication_entry(
        &self,
        uid: &str,
        disease: &str,
        timestamp: NaiveDateTime,
    ) -> DbResult<i64> {
        let uid = normalize_uid(uid).map_err(DbError::Validation)?;
        let disease = validate_disease(disease)?;
        self.conn.execute(
            "INSERT INTO medication_history (uid, disease, timestamp) VALUES (?1, ?2, ?3)",
            params![uid, disease, format_history_timestamp(&timestamp)],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, uid = %uid, "medication history entry added");
        Ok(id)
    }

    /// History for one patient, newest first; equal timestamps newest id first.
    pub fn list_medication_entries(&self, uid: &str) -> DbResult<Vec<MedicationHistoryEntry>> {
        let uid = normalize_uid(uid).map_err(DbError::Validation)?;
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, uid, disease, timestamp
            FROM medication_history
            WHERE uid = ?
            ORDER BY timestamp DESC, id DESC
            "#,
        )?;
        let rows = stmt.query_map([uid], |row| {
            Ok(MedicationHistoryEntry {
                id: row.get(0)?,
                uid: row.get(1)?,
                disease: row.get(2)?,
                timestamp: timestamp_column(row, 3)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Remove one entry matching uid, disease and timestamp exactly.
    ///
    /// The disease is trimmed the same way as on append.
    /// When several rows match, only the one with the lowest id is removed.
    /// Returns the number of rows removed (0 or 1).
    pub fn delete_medication_entry(
        &self,
        uid: &str,
        disease: &str,
        timestamp: NaiveDateTime,
    ) -> DbResult<usize> {
        let uid = normalize_uid(uid).map_err(DbError::Validation)?;
        let disease = disease.trim();
        let timestamp = to_history_resolution(timestamp);
        let removed = self.conn.execute(
            r#"
            DELETE FROM medication_history
            WHERE id = (
                SELECT MIN(id) FROM medication_history
                WHERE uid = ?1 AND disease = ?2 AND timestamp = ?3
            )
            "#,
            params![uid, disease, format_history_timestamp(&timestamp)],
        )?;
        tracing::debug!(uid = %uid, removed, "medication history delete");
        Ok(removed)
    }
}
