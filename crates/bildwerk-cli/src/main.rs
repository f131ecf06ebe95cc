// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bildwerk — assemble images into a PDF.
//
// Entry point. Initialises logging, loads inputs and settings, runs the page
// assembler with Ctrl-C wired to cancellation, and writes the document.

mod args;
mod input;

use std::process::ExitCode;

use anyhow::{Context, Result};
use bildwerk_core::human_errors::humanize_error;
use bildwerk_core::{BildwerkError, RawSettings, RunEvent, RunOutput};
use bildwerk_document::{PageAssembler, PdfSink};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};

use args::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let raw = match &cli.config {
        Some(path) => RawSettings::from_json_file(path)?,
        None => RawSettings::default(),
    };
    let settings = cli.apply_to(raw).resolve()?;

    let (mut batch, positions) = input::load_batch(&cli.images).await?;
    input::apply_rotations(&mut batch, &positions, &cli.rotations)?;

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let assembler = PageAssembler::new().with_events(events_tx);

    let cancel = assembler.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current page");
            cancel.cancel();
        }
    });

    let progress = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            match event {
                RunEvent::Progress { page_index, page_count } => {
                    info!("processing page {} of {}", page_index + 1, page_count);
                }
                RunEvent::Finished(status) => info!(?status, "run finished"),
            }
        }
    });

    let mut sink = PdfSink::new();
    let result = assembler.run(batch.snapshot(), &settings, &mut sink).await;
    drop(assembler);
    // The channel closes once the assembler is gone.
    let _ = progress.await;

    let RunOutput { bytes, page_count } = result?;
    tokio::fs::write(&cli.output, &bytes)
        .await
        .with_context(|| format!("failed to write {}", cli.output.display()))?;

    info!(page_count, bytes = bytes.len(), path = %cli.output.display(), "PDF written");
    println!("Wrote {page_count} page(s) → {}", cli.output.display());
    Ok(())
}

/// Print the failure, in plain language when it came from the engine.
fn report(err: &anyhow::Error) {
    match err.downcast_ref::<BildwerkError>() {
        Some(engine_err) => {
            let human = humanize_error(engine_err);
            eprintln!("{}", human.message);
            eprintln!("  {}", human.suggestion);
            tracing::debug!(error = %engine_err, stage = ?human.stage, "run failed");
        }
        None => eprintln!("error: {err:#}"),
    }
}
