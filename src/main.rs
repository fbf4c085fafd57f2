//! Clearance — secure document portal entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Init logger at default level
//!   3. Load config
//!   4. Open the portal (store, audit log, provider)
//!   5. Print status and exit

use tracing::info;

use clearance::{config, error::AppError, logger, portal::Portal};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    // Load .env if present — ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    // Bootstrap logger at "info" before config is available.
    logger::init("info")?;

    let config = config::load()?;

    info!(
        portal = %config.portal_name,
        work_dir = %config.work_dir.display(),
        log_level = %config.log_level,
        llm_provider = %config.llm.provider,
        "config loaded"
    );

    let portal = Portal::open(&config)?;
    let status = portal.status()?;

    info!(
        indexed_chunks = status.indexed_chunks,
        audit_events = status.audit_events,
        "portal ready"
    );
    println!(
        "✓ Portal initialized: {} indexed chunks, {} audit events",
        status.indexed_chunks, status.audit_events
    );

    Ok(())
}
