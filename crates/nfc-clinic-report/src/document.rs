//! Patient health report layout.

use chrono::NaiveDateTime;
use nfc_clinic::models::{PatientField, PatientRecord};
use serde::{Deserialize, Serialize};

/// Report heading shown under the institution name.
pub const REPORT_TITLE: &str = "PATIENT HEALTH REPORT";

/// Attachment name used for delivered reports.
pub const ATTACHMENT_NAME: &str = "Patient_Report.txt";

const GENERATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const LABEL_WIDTH: usize = 18;

/// Institution details printed on every report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportBranding {
    pub institution: String,
    pub helpline: Option<String>,
}

impl Default for ReportBranding {
    fn default() -> Self {
        Self {
            institution: "NFC CLINIC".into(),
            helpline: None,
        }
    }
}

/// A rendered-ready snapshot of one patient record.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientReport {
    pub uid: String,
    pub branding: ReportBranding,
    /// `(label, value)` rows in form order
    pub rows: Vec<(&'static str, String)>,
    pub generated_at: NaiveDateTime,
}

impl PatientReport {
    pub fn from_record(
        record: &PatientRecord,
        generated_at: NaiveDateTime,
        branding: ReportBranding,
    ) -> Self {
        let rows = PatientField::ALL
            .iter()
            .map(|f| (f.label(), record.fields.get(*f).to_string()))
            .collect();
        Self {
            uid: record.uid.clone(),
            branding,
            rows,
            generated_at,
        }
    }

    /// Plain-text rendering used as the attachment body.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.branding.institution);
        out.push('\n');
        out.push_str(REPORT_TITLE);
        out.push_str("\n\n");
        out.push_str(&format!("{:<width$} {}\n", "UID:", self.uid, width = LABEL_WIDTH));

        for (label, value) in &self.rows {
            let mut lines = value.lines();
            let first = lines.next().unwrap_or("");
            out.push_str(&format!(
                "{:<width$} {}\n",
                format!("{}:", label),
                first,
                width = LABEL_WIDTH
            ));
            // Continuation lines of multi-line fields stay under the value column.
            for line in lines {
                out.push_str(&format!("{:<width$} {}\n", "", line, width = LABEL_WIDTH));
            }
        }

        out.push('\n');
        if let Some(helpline) = &self.branding.helpline {
            out.push_str(&format!("{} - Helpline: {}\n", self.branding.institution, helpline));
        }
        out.push_str(&format!(
            "Generated on: {}\n",
            self.generated_at.format(GENERATED_FORMAT)
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn generated() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, 1)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_rows_follow_form_order() {
        let mut record = PatientRecord::blank("1A2B3C4D");
        record.fields.patient_name = "Jane Doe".into();

        let report = PatientReport::from_record(&record, generated(), ReportBranding::default());
        let labels: Vec<_> = report.rows.iter().map(|(l, _)| *l).collect();
        assert_eq!(labels[0], "Doctor Name");
        assert_eq!(labels[1], "Patient Name");
        assert_eq!(labels[7], "Prescription");
        assert_eq!(report.rows[1].1, "Jane Doe");
    }

    #[test]
    fn test_render_text_layout() {
        let mut record = PatientRecord::blank("1A2B3C4D");
        record.fields.diagnosis = "Flu\nmild fever".into();

        let branding = ReportBranding {
            institution: "CITY HOSPITAL".into(),
            helpline: Some("044 0000 0000".into()),
        };
        let text = PatientReport::from_record(&record, generated(), branding).render_text();

        assert!(text.starts_with("CITY HOSPITAL\nPATIENT HEALTH REPORT\n"));
        assert!(text.contains("Diagnosis:         Flu\n"));
        assert!(text.contains("\n                   mild fever\n"));
        assert!(text.contains("CITY HOSPITAL - Helpline: 044 0000 0000\n"));
        assert!(text.ends_with("Generated on: 2024-07-01 14:30:00\n"));
    }
}
