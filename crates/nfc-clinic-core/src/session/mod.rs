//! Session Controller: serializes every load into the editable form.
//!
//! Background tasks hold a [`SessionHandle`] and may only enqueue messages.
//! The interactive thread owns the [`SessionController`], drains the queue
//! with [`SessionController::pump`], and is the only place the
//! [`FormModel`] is mutated.

mod controller;
mod form;
mod handle;

pub use controller::*;
pub use form::*;
pub use handle::*;

use thiserror::Error;

use crate::db::DbError;

/// Errors surfaced to the interactive layer.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(DbError),

    #[error("Stale load for {uid} discarded (sequence {seq}, current {current})")]
    Conflict { uid: String, seq: u64, current: u64 },
}

impl From<DbError> for SessionError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Validation(msg) => SessionError::Validation(msg),
            other => SessionError::Storage(other),
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Result of applying a lookup to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The stored record now populates the form.
    Loaded(crate::models::PatientRecord),
    /// No record exists for this UID; the form was left untouched.
    NewIdentity { uid: String },
}
