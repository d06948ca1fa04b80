//! Typed, in-memory editable form model.

use crate::models::{PatientField, PatientFields, PatientRecord};

/// The form the interactive layer renders and edits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormModel {
    fields: PatientFields,
    dirty: bool,
}

impl FormModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &PatientFields {
        &self.fields
    }

    pub fn get(&self, field: PatientField) -> &str {
        self.fields.get(field)
    }

    /// User edit of one field.
    pub fn set(&mut self, field: PatientField, value: impl Into<String>) {
        self.fields.set(field, value);
        self.dirty = true;
    }

    /// Whether the user has edited since the last load, save or clear.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Replace every field with stored values.
    pub fn replace(&mut self, fields: PatientFields) {
        self.fields = fields;
        self.dirty = false;
    }

    pub fn clear(&mut self) {
        self.replace(PatientFields::default());
    }

    /// Current contents as a full record under `uid`.
    pub fn snapshot(&self, uid: impl Into<String>) -> PatientRecord {
        PatientRecord::new(uid, self.fields.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_marks_dirty_and_replace_resets() {
        let mut form = FormModel::new();
        assert!(!form.is_dirty());

        form.set(PatientField::PatientName, "Jane Doe");
        assert!(form.is_dirty());
        assert_eq!(form.get(PatientField::PatientName), "Jane Doe");

        form.replace(PatientFields::default());
        assert!(!form.is_dirty());
        assert!(form.fields().is_blank());
    }

    #[test]
    fn test_snapshot_carries_all_fields() {
        let mut form = FormModel::new();
        form.set(PatientField::Prescription, "Rest");
        let record = form.snapshot("1A2B3C4D");
        assert_eq!(record.uid, "1A2B3C4D");
        assert_eq!(record.fields.prescription, "Rest");
        assert_eq!(record.fields.diagnosis, "");
    }
}
