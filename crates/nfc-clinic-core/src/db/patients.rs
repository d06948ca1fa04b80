//! Record Store: patient records keyed by UID.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::{normalize_uid, PatientFields, PatientRecord};

impl Database {
    /// Insert or wholesale replace the record for `record.uid`.
    ///
    /// Every field is written; nothing from a previous row survives.
    pub fn upsert_patient(&self, record: &PatientRecord) -> DbResult<()> {
        let uid = normalize_uid(&record.uid).map_err(DbError::Validation)?;
        let f = &record.fields;
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO patients (
                uid, doctor_name, patient_name, patient_number, patient_address,
                diagnosis, past_treatment, medications, prescription
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                uid,
                f.doctor_name,
                f.patient_name,
                f.patient_number,
                f.patient_address,
                f.diagnosis,
                f.past_treatment,
                f.medications,
                f.prescription,
            ],
        )?;
        tracing::debug!(uid = %uid, "patient record saved");
        Ok(())
    }

    /// Get a patient by UID. A miss is `Ok(None)`.
    pub fn get_patient(&self, uid: &str) -> DbResult<Option<PatientRecord>> {
        let uid = normalize_uid(uid).map_err(DbError::Validation)?;
        self.conn
            .query_row(
                r#"
                SELECT uid, doctor_name, patient_name, patient_number, patient_address,
                       diagnosis, past_treatment, medications, prescription
                FROM patients
                WHERE uid = ?
                "#,
                [&uid],
                |row| {
                    // Rows written by older tooling may hold NULLs.
                    let text = |idx: usize| -> rusqlite::Result<String> {
                        Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
                    };
                    Ok(PatientRecord {
                        uid: row.get(0)?,
                        fields: PatientFields {
                            doctor_name: text(1)?,
                            patient_name: text(2)?,
                            patient_number: text(3)?,
                            patient_address: text(4)?,
                            diagnosis: text(5)?,
                            past_treatment: text(6)?,
                            medications: text(7)?,
                            prescription: text(8)?,
                        },
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }
}
