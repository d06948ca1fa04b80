//! Record Store and Audit Log integration tests.

use chrono::{NaiveDate, NaiveDateTime};
use nfc_clinic::db::Database;
use nfc_clinic::models::{PatientField, PatientFields, PatientRecord};
use proptest::prelude::*;

fn ts(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 7, 1)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

fn arb_uid() -> impl Strategy<Value = String> {
    "[0-9A-F]{8}"
}

fn arb_fields() -> impl Strategy<Value = PatientFields> {
    proptest::collection::vec("\\PC{0,24}", 8).prop_map(|values| {
        let mut fields = PatientFields::default();
        for (field, value) in PatientField::ALL.iter().zip(values) {
            fields.set(*field, value);
        }
        fields
    })
}

proptest! {
    #[test]
    fn prop_upsert_then_get_returns_fields(uid in arb_uid(), fields in arb_fields()) {
        let db = Database::open_in_memory().unwrap();
        db.upsert_patient(&PatientRecord::new(uid.clone(), fields.clone())).unwrap();

        let loaded = db.get_patient(&uid).unwrap().unwrap();
        prop_assert_eq!(loaded.uid, uid);
        prop_assert_eq!(loaded.fields, fields);
    }

    #[test]
    fn prop_second_upsert_fully_replaces(
        uid in arb_uid(),
        first in arb_fields(),
        second in arb_fields(),
    ) {
        let db = Database::open_in_memory().unwrap();
        db.upsert_patient(&PatientRecord::new(uid.clone(), first)).unwrap();
        db.upsert_patient(&PatientRecord::new(uid.clone(), second.clone())).unwrap();

        let loaded = db.get_patient(&uid).unwrap().unwrap();
        prop_assert_eq!(loaded.fields, second);
    }

    #[test]
    fn prop_medication_list_sorted_desc(hours in proptest::collection::vec(0u32..24, 1..12)) {
        let db = Database::open_in_memory().unwrap();
        for h in &hours {
            db.append_medication_entry("1A2B3C4D", "Dose", ts(*h, 0, 0)).unwrap();
        }

        let entries = db.list_medication_entries("1A2B3C4D").unwrap();
        prop_assert_eq!(entries.len(), hours.len());
        for pair in entries.windows(2) {
            let ordered = pair[0].timestamp > pair[1].timestamp
                || (pair[0].timestamp == pair[1].timestamp && pair[0].id > pair[1].id);
            prop_assert!(ordered);
        }
    }
}

#[test]
fn test_scenario_partial_fields_read_back_empty() {
    let db = Database::open_in_memory().unwrap();
    let fields = PatientFields {
        patient_name: "Jane Doe".into(),
        diagnosis: "Flu".into(),
        ..Default::default()
    };
    db.upsert_patient(&PatientRecord::new("1A2B3C4D", fields))
        .unwrap();

    let loaded = db.get_patient("1A2B3C4D").unwrap().unwrap();
    assert_eq!(loaded.fields.patient_name, "Jane Doe");
    assert_eq!(loaded.fields.diagnosis, "Flu");
    for field in PatientField::ALL {
        if field != PatientField::PatientName && field != PatientField::Diagnosis {
            assert_eq!(loaded.fields.get(field), "", "{} should be empty", field.label());
        }
    }
}

#[test]
fn test_scenario_medication_history_newest_first() {
    let db = Database::open_in_memory().unwrap();
    let t1 = ts(9, 0, 0);
    let t2 = ts(9, 30, 0);
    db.append_medication_entry("1A2B3C4D", "Flu", t1).unwrap();
    db.append_medication_entry("1A2B3C4D", "Cold", t2).unwrap();

    let listed: Vec<_> = db
        .list_medication_entries("1A2B3C4D")
        .unwrap()
        .into_iter()
        .map(|e| (e.disease, e.timestamp))
        .collect();
    assert_eq!(listed, vec![("Cold".to_string(), t2), ("Flu".to_string(), t1)]);
}

#[test]
fn test_duplicate_delete_leaves_identical_row() {
    let db = Database::open_in_memory().unwrap();
    let low = db.append_medication_entry("1A2B3C4D", "Flu", ts(9, 0, 0)).unwrap();
    let high = db.append_medication_entry("1A2B3C4D", "Flu", ts(9, 0, 0)).unwrap();

    assert_eq!(db.delete_medication_entry("1A2B3C4D", "Flu", ts(9, 0, 0)).unwrap(), 1);

    let remaining = db.list_medication_entries("1A2B3C4D").unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, high);
    assert_eq!(remaining[0].disease, "Flu");
    assert_eq!(remaining[0].timestamp, ts(9, 0, 0));

    // A second delete takes the last one; a third finds nothing.
    assert_eq!(db.delete_medication_entry("1A2B3C4D", "Flu", ts(9, 0, 0)).unwrap(), 1);
    assert_eq!(db.delete_medication_entry("1A2B3C4D", "Flu", ts(9, 0, 0)).unwrap(), 0);
    assert!(low < high);
}

#[test]
fn test_email_logs_survive_patient_overwrite() {
    let db = Database::open_in_memory().unwrap();
    db.upsert_patient(&PatientRecord::blank("1A2B3C4D")).unwrap();
    db.append_email_log("1A2B3C4D", "doc@example.org", ts(10, 0, 0))
        .unwrap();
    db.upsert_patient(&PatientRecord::blank("1A2B3C4D")).unwrap();

    assert_eq!(db.list_email_logs().unwrap().len(), 1);
}
