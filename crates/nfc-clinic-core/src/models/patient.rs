//! Patient record models.

use serde::{Deserialize, Serialize};

/// One of the eight free-text fields of a patient record, in form order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatientField {
    DoctorName,
    PatientName,
    PatientNumber,
    PatientAddress,
    Diagnosis,
    PastTreatment,
    Medications,
    Prescription,
}

impl PatientField {
    /// All fields in display order, which is also table column order.
    pub const ALL: [PatientField; 8] = [
        PatientField::DoctorName,
        PatientField::PatientName,
        PatientField::PatientNumber,
        PatientField::PatientAddress,
        PatientField::Diagnosis,
        PatientField::PastTreatment,
        PatientField::Medications,
        PatientField::Prescription,
    ];

    /// Human-readable label used by forms and reports.
    pub fn label(&self) -> &'static str {
        match self {
            PatientField::DoctorName => "Doctor Name",
            PatientField::PatientName => "Patient Name",
            PatientField::PatientNumber => "Patient Number",
            PatientField::PatientAddress => "Patient Address",
            PatientField::Diagnosis => "Diagnosis",
            PatientField::PastTreatment => "Past Treatment",
            PatientField::Medications => "Medications",
            PatientField::Prescription => "Prescription",
        }
    }
}

/// The editable contents of a patient record. Every save supplies all of them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatientFields {
    pub doctor_name: String,
    pub patient_name: String,
    pub patient_number: String,
    pub patient_address: String,
    pub diagnosis: String,
    pub past_treatment: String,
    pub medications: String,
    pub prescription: String,
}

impl PatientFields {
    pub fn get(&self, field: PatientField) -> &str {
        match field {
            PatientField::DoctorName => &self.doctor_name,
            PatientField::PatientName => &self.patient_name,
            PatientField::PatientNumber => &self.patient_number,
            PatientField::PatientAddress => &self.patient_address,
            PatientField::Diagnosis => &self.diagnosis,
            PatientField::PastTreatment => &self.past_treatment,
            PatientField::Medications => &self.medications,
            PatientField::Prescription => &self.prescription,
        }
    }

    pub fn set(&mut self, field: PatientField, value: impl Into<String>) {
        let slot = match field {
            PatientField::DoctorName => &mut self.doctor_name,
            PatientField::PatientName => &mut self.patient_name,
            PatientField::PatientNumber => &mut self.patient_number,
            PatientField::PatientAddress => &mut self.patient_address,
            PatientField::Diagnosis => &mut self.diagnosis,
            PatientField::PastTreatment => &mut self.past_treatment,
            PatientField::Medications => &mut self.medications,
            PatientField::Prescription => &mut self.prescription,
        };
        *slot = value.into();
    }

    /// True when every field is empty.
    pub fn is_blank(&self) -> bool {
        PatientField::ALL.iter().all(|f| self.get(*f).is_empty())
    }

    /// Iterate `(field, value)` pairs in form order.
    pub fn iter(&self) -> impl Iterator<Item = (PatientField, &str)> + '_ {
        PatientField::ALL.iter().map(move |f| (*f, self.get(*f)))
    }
}

/// A persisted patient record, keyed by tag UID.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatientRecord {
    /// Hex UID read from the identity tag (or typed in manually)
    pub uid: String,
    #[serde(flatten)]
    pub fields: PatientFields,
}

impl PatientRecord {
    pub fn new(uid: impl Into<String>, fields: PatientFields) -> Self {
        Self {
            uid: uid.into(),
            fields,
        }
    }

    /// Record with the given UID and every field empty.
    pub fn blank(uid: impl Into<String>) -> Self {
        Self::new(uid, PatientFields::default())
    }
}

/// Normalize a UID, rejecting empty or control-character input.
pub fn normalize_uid(uid: &str) -> Result<String, String> {
    let trimmed = uid.trim();
    if trimmed.is_empty() {
        return Err("UID must not be empty".into());
    }
    if trimmed.chars().any(char::is_control) {
        return Err(format!("UID contains control characters: {:?}", trimmed));
    }
    Ok(trimmed.to_string())
}
