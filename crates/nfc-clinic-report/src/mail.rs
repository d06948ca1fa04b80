//! Report delivery through a pluggable mail transport.

use chrono::NaiveDateTime;
use nfc_clinic::db::{acquire, DbError, SharedDatabase};
use nfc_clinic::models::{normalize_email, normalize_uid};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::{PatientReport, ReportBranding, ATTACHMENT_NAME};

/// Transport-level failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MailError {
    #[error("Mail transport error: {0}")]
    Transport(String),

    #[error("Recipient {recipient} rejected: {reason}")]
    Rejected { recipient: String, reason: String },
}

/// Report delivery errors.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("No patient record for UID {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(DbError),

    #[error(transparent)]
    Mail(#[from] MailError),
}

impl From<DbError> for ReportError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Validation(msg) => ReportError::Validation(msg),
            other => ReportError::Database(other),
        }
    }
}

pub type ReportResult<T> = Result<T, ReportError>;

/// A message ready for the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingReport {
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub attachment_name: String,
    pub attachment: Vec<u8>,
}

/// Mail transport (SMTP or otherwise). Implementations block until the
/// message is accepted or refused.
pub trait Mailer {
    fn send(&self, message: &OutgoingReport) -> Result<(), MailError>;
}

impl<M: Mailer + ?Sized> Mailer for &M {
    fn send(&self, message: &OutgoingReport) -> Result<(), MailError> {
        (**self).send(message)
    }
}

impl<M: Mailer + ?Sized> Mailer for Box<M> {
    fn send(&self, message: &OutgoingReport) -> Result<(), MailError> {
        (**self).send(message)
    }
}

/// Proof of a logged delivery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryReceipt {
    pub log_id: i64,
    pub uid: String,
    pub recipient: String,
    pub sent_at: NaiveDateTime,
}

pub const DEFAULT_SUBJECT: &str = "Patient Report";
const DEFAULT_BODY: &str = "Find attached patient report.";

/// Sends patient reports and records successful deliveries.
pub struct ReportDispatcher<M> {
    db: SharedDatabase,
    mailer: M,
    branding: ReportBranding,
    subject: String,
}

impl<M: Mailer> ReportDispatcher<M> {
    pub fn new(db: SharedDatabase, mailer: M) -> Self {
        Self {
            db,
            mailer,
            branding: ReportBranding::default(),
            subject: DEFAULT_SUBJECT.into(),
        }
    }

    pub fn with_branding(mut self, branding: ReportBranding) -> Self {
        self.branding = branding;
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Render the stored record for `uid` and mail it to `recipient`.
    ///
    /// The store is not locked while the transport runs, and nothing is
    /// written unless the transport accepts the message.
    pub fn send_report(
        &self,
        uid: &str,
        recipient: &str,
        now: NaiveDateTime,
    ) -> ReportResult<DeliveryReceipt> {
        let uid = normalize_uid(uid).map_err(ReportError::Validation)?;
        let recipient = normalize_email(recipient).map_err(ReportError::Validation)?;

        let record = acquire(&self.db)?
            .get_patient(&uid)?
            .ok_or_else(|| ReportError::NotFound(uid.clone()))?;

        let report = PatientReport::from_record(&record, now, self.branding.clone());
        let message = OutgoingReport {
            recipient: recipient.clone(),
            subject: self.subject.clone(),
            body: DEFAULT_BODY.into(),
            attachment_name: ATTACHMENT_NAME.into(),
            attachment: report.render_text().into_bytes(),
        };

        if let Err(e) = self.mailer.send(&message) {
            tracing::warn!(uid = %uid, error = %e, "report delivery failed");
            return Err(e.into());
        }

        let log_id = acquire(&self.db)?.append_email_log(&uid, &recipient, now)?;
        tracing::info!(uid = %uid, log_id, "report delivered");
        Ok(DeliveryReceipt {
            log_id,
            uid,
            recipient,
            sent_at: now,
        })
    }
}
