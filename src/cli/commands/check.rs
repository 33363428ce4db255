//! Consistency check command.

use console::style;

use crate::config::Settings;
use crate::index::check_on_startup;

use super::helpers::open_stack;

/// Run the startup consistency check and report what it did.
pub async fn cmd_check(settings: &Settings) -> anyhow::Result<()> {
    let stack = open_stack(settings, false)?;

    let docs_before = stack.index.num_docs()?;
    check_on_startup(&stack.store, &stack.index, &stack.spell, &stack.rebuilder)?;
    let docs_after = stack.index.num_docs()?;

    if docs_before == 0 && docs_after > 0 {
        println!(
            "{} Index was empty, rebuilt with {} versions",
            style("✓").green(),
            docs_after
        );
    } else {
        println!(
            "{} Index is consistent ({} indexed, {} versions stored)",
            style("✓").green(),
            docs_after,
            stack.store.count_versions()?
        );
    }
    Ok(())
}
