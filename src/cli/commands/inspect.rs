//! Introspection commands: extractors, engines, status.

use console::style;

use crate::config::Settings;
use crate::extract::ExtractorRegistry;
use crate::ocr::{is_engine_compiled, OcrChain, ENGINE_PRIORITY};

use super::helpers::open_stack;

/// List registered content types and the extractor behind each.
pub async fn cmd_extractors(settings: &Settings) -> anyhow::Result<()> {
    let registry = ExtractorRegistry::from_ids(&settings.extraction.extractors);

    println!("\n{}", style("Registered extractors").bold());
    println!("{}", "-".repeat(50));

    if registry.is_empty() {
        println!("  {} none registered", style("!").yellow());
        return Ok(());
    }

    for content_type in registry.content_types() {
        let name = registry
            .lookup(&content_type)
            .map(|extractor| extractor.name())
            .unwrap_or("?");
        println!("  {:<8} {}", style(name).cyan(), content_type);
    }
    Ok(())
}

/// Show the OCR chain in priority order with availability hints.
pub async fn cmd_engines(settings: &Settings) -> anyhow::Result<()> {
    let chain = OcrChain::from_config(&settings.ocr);

    println!("\n{}", style("OCR engines").bold());
    println!("{}", "-".repeat(50));

    for id in ENGINE_PRIORITY {
        if let Some(engine) = chain.engines().iter().find(|engine| engine.id() == *id) {
            let status = if engine.is_available() {
                style("✓ available").green()
            } else {
                style("○ not available").yellow()
            };
            println!("  {:<12} {}", id, status);
            if !engine.is_available() {
                println!("               {}", style(engine.availability_hint()).dim());
            }
        } else if is_engine_compiled(id) {
            println!("  {:<12} {}", id, style("not configured").dim());
        } else {
            println!(
                "  {:<12} {}",
                id,
                style(format!("not compiled (enable ocr-{id} feature)")).dim()
            );
        }
    }

    if !chain.any_engine_registered() {
        println!(
            "\n{} No OCR engine is configured; the PDF image fallback is disabled",
            style("!").yellow()
        );
    }
    Ok(())
}

/// Show store and index counts.
pub async fn cmd_status(settings: &Settings) -> anyhow::Result<()> {
    let stack = open_stack(settings, true)?;

    println!("\n{}", style("textmill status").bold());
    println!("{}", "-".repeat(50));
    println!("  data dir      {}", settings.data_dir.display());
    println!("  documents     {}", stack.store.count_documents()?);
    println!("  versions      {}", stack.store.count_versions()?);
    println!("  pending       {}", stack.store.count_pending()?);
    println!("  indexed       {}", stack.index.num_docs()?);
    println!("  dictionary    {} words", stack.spell.num_words()?);
    Ok(())
}
