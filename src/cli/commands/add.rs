//! Add command: ingest files into the archive.

use std::path::PathBuf;

use console::style;

use crate::config::Settings;
use crate::models::ExtractionOutcome;
use crate::services::IngestOutcome;

use super::helpers::open_stack;

/// Ingest one or more files: store content, extract text, index.
pub async fn cmd_add(
    settings: &Settings,
    paths: &[PathBuf],
    title: Option<&str>,
) -> anyhow::Result<()> {
    if paths.is_empty() {
        anyhow::bail!("no files given");
    }
    if title.is_some() && paths.len() > 1 {
        anyhow::bail!("--title only applies to a single file");
    }

    let stack = open_stack(settings, true)?;
    let service = stack.service(settings);

    let mut added = 0;
    let mut duplicates = 0;
    let mut failed = 0;

    for path in paths {
        match service.ingest_file(path, title).await {
            Ok(IngestOutcome::Ingested {
                version_id,
                extraction,
                ..
            }) => {
                added += 1;
                match extraction.outcome {
                    ExtractionOutcome::Success => println!(
                        "  {} {} (version {})",
                        style("✓").green(),
                        path.display(),
                        version_id
                    ),
                    outcome => println!(
                        "  {} {} stored, but not indexed: {}",
                        style("!").yellow(),
                        path.display(),
                        extraction.failure.as_deref().unwrap_or(outcome.as_str())
                    ),
                }
            }
            Ok(IngestOutcome::Duplicate { version_id }) => {
                duplicates += 1;
                println!(
                    "  {} {} already stored as version {}",
                    style("→").dim(),
                    path.display(),
                    version_id
                );
            }
            Err(err) => {
                failed += 1;
                eprintln!("  {} {}: {}", style("✗").red(), path.display(), err);
            }
        }
    }

    println!(
        "{} {} added, {} duplicates, {} failed",
        style("✓").green(),
        added,
        duplicates,
        failed
    );
    if failed > 0 {
        anyhow::bail!("{failed} file(s) could not be ingested");
    }
    Ok(())
}
