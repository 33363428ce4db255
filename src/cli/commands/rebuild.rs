//! Rebuild command: full re-index from the version store.

use console::style;

use crate::config::Settings;

use super::helpers::open_stack;

/// Rebuild the search index and spell dictionary, regardless of state.
pub async fn cmd_rebuild(settings: &Settings) -> anyhow::Result<()> {
    // No startup check: this command rebuilds unconditionally
    let stack = open_stack(settings, false)?;

    println!(
        "{} Rebuilding search index from the store",
        style("→").cyan()
    );
    let summary = match stack.rebuilder.rebuild_all(&stack.store, &stack.index) {
        Ok(summary) => summary,
        Err(err) => {
            eprintln!("  {} Index rebuild failed: {}", style("✗").red(), err);
            return Err(err.into());
        }
    };
    println!(
        "  {} {} versions indexed in {:.1}s",
        style("✓").green(),
        summary.versions,
        summary.elapsed.as_secs_f64()
    );

    match stack.spell.rebuild_full(&stack.index) {
        Ok(()) => println!(
            "  {} Spell dictionary rebuilt ({} words)",
            style("✓").green(),
            stack.spell.num_words()?
        ),
        Err(err) => {
            // the dictionary is derived data; the search index is already good
            println!(
                "  {} Spell dictionary rebuild failed: {}",
                style("!").yellow(),
                err
            );
        }
    }

    Ok(())
}
