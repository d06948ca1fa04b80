//! The interactive-thread side of the session.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use super::{
    FormModel, LoadOutcome, Sequencer, SessionError, SessionHandle, SessionMessage, SessionResult,
};
use crate::db::{acquire, SharedDatabase};
use crate::identity::PollerHandle;
use crate::models::{normalize_uid, PatientFields, PatientRecord};

const SCAN_PUMP_INTERVAL: Duration = Duration::from_millis(200);

/// Coordinates loads and saves for one workstation session.
///
/// Every load and save is stamped from one [`Sequencer`]. A load is applied
/// only if its number is newer than the last applied load and newer than
/// the last save of the same UID. A lookup queued before a save can never
/// overwrite what was saved, while a scan of another tag still goes through.
pub struct SessionController {
    db: SharedDatabase,
    tx: Sender<SessionMessage>,
    rx: Receiver<SessionMessage>,
    sequencer: Sequencer,
    applied_seq: u64,
    saved_seq: HashMap<String, u64>,
    current_uid: Option<String>,
    pending_uid: Option<String>,
    form: FormModel,
}

impl SessionController {
    pub fn new(db: SharedDatabase) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            db,
            tx,
            rx,
            sequencer: Sequencer::default(),
            applied_seq: 0,
            saved_seq: HashMap::new(),
            current_uid: None,
            pending_uid: None,
            form: FormModel::new(),
        }
    }

    /// Producer handle for background tasks such as the identity poller.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle::new(self.tx.clone(), self.sequencer.clone())
    }

    pub fn database(&self) -> &SharedDatabase {
        &self.db
    }

    pub fn form(&self) -> &FormModel {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FormModel {
        &mut self.form
    }

    /// UID of the record the form was last loaded from or saved to.
    pub fn current_uid(&self) -> Option<&str> {
        self.current_uid.as_deref()
    }

    /// UID seen with no stored record, awaiting first entry.
    pub fn pending_uid(&self) -> Option<&str> {
        self.pending_uid.as_deref()
    }

    /// Sequence number of the last applied load.
    pub fn applied_seq(&self) -> u64 {
        self.applied_seq
    }

    /// Sequence number of the last save of `uid`, if it was saved this session.
    pub fn saved_seq(&self, uid: &str) -> Option<u64> {
        self.saved_seq.get(uid).copied()
    }

    /// Manual UID entry: look up and apply immediately.
    pub fn on_uid_available(&mut self, uid: &str) -> SessionResult<LoadOutcome> {
        let seq = self.sequencer.next();
        self.apply_load(seq, uid)
    }

    /// Persist a full record, then make it the current one.
    ///
    /// Returns the sequence number assigned to the save.
    pub fn save_current(&mut self, record: PatientRecord) -> SessionResult<u64> {
        let uid = normalize_uid(&record.uid).map_err(SessionError::Validation)?;
        let seq = self.sequencer.next();
        let record = PatientRecord::new(uid.clone(), record.fields);

        acquire(&self.db)?.upsert_patient(&record)?;

        self.saved_seq.insert(uid.clone(), seq);
        self.form.replace(record.fields);
        self.current_uid = Some(uid.clone());
        self.pending_uid = None;
        tracing::info!(uid = %uid, seq, "record saved");
        Ok(seq)
    }

    /// Save whatever the form currently holds under `uid`.
    pub fn save_form(&mut self, uid: &str) -> SessionResult<u64> {
        let record = self.form.snapshot(uid);
        self.save_current(record)
    }

    /// Start a blank entry for a new identity (explicit user action).
    pub fn begin_new(&mut self, uid: &str) -> SessionResult<()> {
        let uid = normalize_uid(uid).map_err(SessionError::Validation)?;
        self.form.replace(PatientFields::default());
        self.current_uid = None;
        self.pending_uid = Some(uid);
        Ok(())
    }

    /// Apply every queued message, in order, on the calling thread.
    pub fn pump(&mut self) -> Vec<SessionResult<LoadOutcome>> {
        let mut results = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            results.push(self.handle_message(message));
        }
        results
    }

    /// Like [`pump`](Self::pump), but wait up to `timeout` for the first message.
    pub fn pump_timeout(&mut self, timeout: Duration) -> Vec<SessionResult<LoadOutcome>> {
        match self.rx.recv_timeout(timeout) {
            Ok(message) => {
                let mut results = vec![self.handle_message(message)];
                results.extend(self.pump());
                results
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => Vec::new(),
        }
    }

    /// Pump until the poller's scan is applied.
    ///
    /// Gives up with `None` once the poller has ended and its message (if
    /// any) failed to apply, when the poller is cancelled, or after `timeout`.
    /// Failed loads are logged and skipped.
    pub fn await_scan(
        &mut self,
        poller: &PollerHandle,
        timeout: Option<Duration>,
    ) -> Option<LoadOutcome> {
        let started = Instant::now();
        loop {
            // Sampled before pumping: a finished poller has already queued its UID.
            let finished = poller.is_finished();

            let mut applied = None;
            for result in self.pump_timeout(SCAN_PUMP_INTERVAL) {
                match result {
                    Ok(outcome) => applied = Some(outcome),
                    Err(e) => tracing::warn!(error = %e, "scanned tag not applied"),
                }
            }
            if applied.is_some() {
                return applied;
            }

            if finished {
                tracing::info!(state = ?poller.state(), "identity poller ended without a load");
                return None;
            }
            if poller.is_cancelled() {
                tracing::info!("scan wait cancelled");
                return None;
            }
            if timeout.map_or(false, |limit| started.elapsed() >= limit) {
                tracing::info!("no tag scanned before timeout");
                return None;
            }
        }
    }

    fn handle_message(&mut self, message: SessionMessage) -> SessionResult<LoadOutcome> {
        match message {
            SessionMessage::UidDetected { seq, uid } => self.apply_load(seq, &uid),
        }
    }

    fn apply_load(&mut self, seq: u64, uid: &str) -> SessionResult<LoadOutcome> {
        let uid = normalize_uid(uid).map_err(SessionError::Validation)?;
        let current = self
            .applied_seq
            .max(self.saved_seq.get(&uid).copied().unwrap_or(0));
        if seq <= current {
            tracing::warn!(uid = %uid, seq, current, "discarding stale load");
            return Err(SessionError::Conflict { uid, seq, current });
        }

        let found = acquire(&self.db)?.get_patient(&uid)?;
        self.applied_seq = seq;

        match found {
            Some(record) => {
                self.form.replace(record.fields.clone());
                self.current_uid = Some(uid);
                self.pending_uid = None;
                tracing::info!(uid = %record.uid, seq, "record loaded");
                Ok(LoadOutcome::Loaded(record))
            }
            None => {
                tracing::info!(uid = %uid, seq, "new identity, awaiting entry");
                self.pending_uid = Some(uid.clone());
                Ok(LoadOutcome::NewIdentity { uid })
            }
        }
    }
}
