//! Patient report rendering and mail delivery.
//!
//! This crate is the document generator / mailer side of the workstation:
//! it reads a record snapshot from the store, renders a report, hands it to
//! a [`Mailer`], and appends an email log entry only after a successful send.

pub mod document;
pub mod mail;

pub use document::*;
pub use mail::*;
