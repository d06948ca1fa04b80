//! Headless workstation session.
//!
//! `nfc-station [UID]` looks up UID directly; without an argument it waits
//! for a tag on the configured reader and applies the first one detected.
//! The wait ends early on end of input (Ctrl-D) or if the scanned tag could
//! not be applied.
//!
//! Environment (a `.env` file is honored): see [`nfc_clinic::config`], plus
//! `CLINIC_SCAN_TIMEOUT_SECS` to give up waiting (default: wait forever).

use std::io::{self, BufReader};
use std::time::{Duration, Instant};

use anyhow::Context;
use nfc_clinic::identity::cancel_on_eof;
use nfc_clinic::{
    db, CancelToken, ClinicConfig, Database, DeviceSource, IdentityPoller, LoadOutcome,
    SessionController,
};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    nfc_clinic::logging::init();

    let config = ClinicConfig::from_env()?;
    let scan_timeout = std::env::var("CLINIC_SCAN_TIMEOUT_SECS")
        .ok()
        .map(|s| s.parse::<u64>().map(Duration::from_secs))
        .transpose()
        .context("CLINIC_SCAN_TIMEOUT_SECS must be a whole number of seconds")?;

    let database = Database::open(&config.database_path).with_context(|| {
        format!("opening database {}", config.database_path.display())
    })?;
    let mut session = SessionController::new(db::shared(database));

    if let Some(uid) = std::env::args().nth(1) {
        let outcome = session.on_uid_available(&uid)?;
        return report(&outcome);
    }

    let cancel = CancelToken::new();
    cancel_on_eof(BufReader::new(io::stdin()), cancel.clone())
        .context("watching standard input")?;

    let source = DeviceSource::new(&config.identity_device, config.read_len);
    tracing::info!(device = %source.path().display(), "waiting for identity tag (Ctrl-D to quit)");
    let poller = IdentityPoller::new(source, session.handle(), config.poll_interval, config.uid_len)
        .with_cancel_token(cancel)
        .spawn()
        .context("starting identity poller")?;

    let outcome = session.await_scan(&poller, scan_timeout);

    // A read blocked inside the device cannot be interrupted; give the
    // poller a moment to notice cancellation, otherwise leave it behind.
    poller.cancel();
    let deadline = Instant::now() + SHUTDOWN_GRACE;
    while !poller.is_finished() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    if poller.is_finished() {
        let final_state = poller.join().context("stopping identity poller")?;
        tracing::debug!(?final_state, "identity poller stopped");
    } else {
        tracing::info!("identity read still blocked, exiting without it");
    }

    match outcome {
        Some(outcome) => report(&outcome),
        None => Ok(()),
    }
}

fn report(outcome: &LoadOutcome) -> anyhow::Result<()> {
    match outcome {
        LoadOutcome::Loaded(record) => {
            println!("{}", serde_json::to_string_pretty(record)?);
        }
        LoadOutcome::NewIdentity { uid } => {
            println!("New UID {}. Enter patient info.", uid);
        }
    }
    Ok(())
}
