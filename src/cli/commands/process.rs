//! Process command: extract and index pending versions.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use crate::config::Settings;
use crate::models::ExtractionOutcome;
use crate::services::IndexEvent;

use super::helpers::open_stack;

/// Run extraction over all pending versions with a progress bar.
pub async fn cmd_process(settings: &Settings, workers: usize, limit: usize) -> anyhow::Result<()> {
    let stack = open_stack(settings, true)?;
    let service = stack.service(settings);

    if service.count_pending()? == 0 {
        println!(
            "{} No versions are waiting for extraction",
            style("!").yellow()
        );
        return Ok(());
    }

    let (event_tx, mut event_rx) = mpsc::channel::<IndexEvent>(100);

    // Progress rendering happens on its own task so workers never block on it
    let event_handler = tokio::spawn(async move {
        let mut progress: Option<ProgressBar> = None;
        let mut too_short = 0usize;
        let mut unsupported = 0usize;

        while let Some(event) = event_rx.recv().await {
            match event {
                IndexEvent::BatchStarted { total } => {
                    println!(
                        "{} Extracting text from {} versions",
                        style("→").cyan(),
                        total
                    );
                    let bar = ProgressBar::new(total as u64);
                    bar.set_style(
                        ProgressStyle::default_bar()
                            .template(
                                "{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}",
                            )
                            .unwrap()
                            .progress_chars("█▓░"),
                    );
                    bar.set_message("Extracting text...");
                    progress = Some(bar);
                }
                IndexEvent::VersionStarted { title, .. } => {
                    if let Some(ref bar) = progress {
                        bar.set_message(title);
                    }
                }
                IndexEvent::VersionCompleted { outcome, .. } => {
                    match outcome {
                        ExtractionOutcome::TooShort => too_short += 1,
                        ExtractionOutcome::UnsupportedType => unsupported += 1,
                        _ => {}
                    }
                    if let Some(ref bar) = progress {
                        bar.inc(1);
                    }
                }
                IndexEvent::VersionFailed { version_id, error } => {
                    if let Some(ref bar) = progress {
                        bar.suspend(|| {
                            eprintln!(
                                "  {} version {} failed: {}",
                                style("✗").red(),
                                version_id,
                                error
                            );
                        });
                        bar.inc(1);
                    } else {
                        eprintln!(
                            "  {} version {} failed: {}",
                            style("✗").red(),
                            version_id,
                            error
                        );
                    }
                }
                IndexEvent::BatchComplete {
                    processed,
                    succeeded,
                    failed,
                } => {
                    if let Some(bar) = progress.take() {
                        bar.finish_and_clear();
                    }
                    println!(
                        "{} {} versions processed: {} indexed, {} failed",
                        style("✓").green(),
                        processed,
                        succeeded,
                        failed
                    );
                    if too_short > 0 {
                        println!(
                            "  {} {} below the minimum text length",
                            style("!").yellow(),
                            too_short
                        );
                    }
                    if unsupported > 0 {
                        println!(
                            "  {} {} with unsupported content types",
                            style("!").yellow(),
                            unsupported
                        );
                    }
                }
            }
        }
    });

    let summary = service.process_pending(workers, limit, event_tx).await?;
    let _ = event_handler.await;

    tracing::debug!(
        processed = summary.processed,
        succeeded = summary.succeeded,
        failed = summary.failed,
        "process run finished"
    );
    Ok(())
}
