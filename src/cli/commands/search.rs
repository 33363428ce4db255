//! Search and suggestion commands.

use console::style;

use crate::config::Settings;

use super::helpers::open_stack;

/// Query the primary index and print matches best-first.
pub async fn cmd_search(settings: &Settings, query: &str, limit: usize) -> anyhow::Result<()> {
    let stack = open_stack(settings, true)?;

    let hits = stack.index.search(query, limit)?;
    if hits.is_empty() {
        println!("{} No documents match '{}'", style("!").yellow(), query);

        // Single-word queries get a spelling hint
        if !query.contains(char::is_whitespace) {
            let suggestions = stack.spell.suggest(query, 3)?;
            if !suggestions.is_empty() {
                println!("  did you mean: {}?", suggestions.join(", "));
            }
        }
        return Ok(());
    }

    let ids: Vec<i64> = hits.iter().map(|hit| hit.version_id).collect();
    let meta = stack.store.version_meta(&ids)?;

    println!("\n{} results for '{}'\n", hits.len(), query);
    for hit in &hits {
        let Some(meta) = meta.iter().find(|m| m.version_id == hit.version_id) else {
            // indexed but gone from the store; the next rebuild drops it
            continue;
        };
        println!(
            "{:>7.3}  {} {} [{}]",
            hit.score,
            style(format!("v{}", meta.version_id)).cyan(),
            style(&meta.title).bold(),
            meta.mime_type
        );
    }
    Ok(())
}

/// Print dictionary words within edit distance of `word`.
pub async fn cmd_suggest(settings: &Settings, word: &str, limit: usize) -> anyhow::Result<()> {
    let stack = open_stack(settings, true)?;

    let suggestions = stack.spell.suggest(word, limit)?;
    if suggestions.is_empty() {
        println!("{} No suggestions for '{}'", style("!").yellow(), word);
        return Ok(());
    }
    for suggestion in suggestions {
        println!("{suggestion}");
    }
    Ok(())
}
