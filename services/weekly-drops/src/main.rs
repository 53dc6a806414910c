//!
//! src/main.rs  Oct 19th, 2026
//!
//! Entry point. Loads configuration, starts the catalog server, runs one
//! curation pass and prints the report
//!
//!

mod config;
mod errors;
mod logging;
mod types;

mod curator;
mod fetch;
mod filter;
mod report;
mod transport;

use std::process::ExitCode;

use chrono::Local;
use tracing::{error, info, warn};

use crate::curator::Curator;
use crate::errors::DropsError;
use crate::fetch::CatalogClient;
use crate::filter::cutoff_instant_with;
use crate::transport::StdioTransport;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(DropsError::Cancelled) => {
            println!("\ncancelled");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "fatal");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), DropsError> {
    let cfgs = config::load_config()?;
    let _logging = logging::init_logging(&cfgs.logging)?;

    info!(
        service = "weekly-drops",
        version = %env!("CARGO_PKG_VERSION"),
        artists = cfgs.curation.artists.len(),
        "starting"
    );

    let now = cfgs.curation.now.unwrap_or_else(|| Local::now().naive_local());
    let cutoff = cutoff_instant_with(now, cfgs.curation.window_days);
    report::print_banner(
        &cfgs.curation.artists,
        cutoff,
        cfgs.curation.window_days,
        cfgs.curation.dry_run
    );

    cfgs.server.ensure_built()?;
    let transport = StdioTransport::spawn(&cfgs.server)?;
    let catalog = CatalogClient::new(transport, cfgs.curation.search_limit);
    let curator = Curator::new(catalog, &cfgs.curation);

    let token = curator.shutdown();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("ctrl-c received, cancelling");
            token.cancel();
        }
    });

    let summary = curator.run(now).await?;
    report::print_summary(&summary);

    if !summary.dry_run {
        let dir = std::env::current_dir()?;
        let binary = std::env::current_exe()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| env!("CARGO_PKG_NAME").to_string());
        report::print_schedule_help(&dir, &binary);
    }

    Ok(())
}
