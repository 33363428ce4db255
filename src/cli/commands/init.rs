use console::style;

use crate::config::Settings;
use crate::store::VersionStore;

/// Create the data directories and the database schema.
pub async fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    settings.ensure_directories()?;

    let store = VersionStore::open(&settings.database_path())?;
    store.init_schema()?;
    println!("  {} Database schema ready", style("✓").green());

    println!(
        "{} Initialized textmill in {}",
        style("✓").green(),
        settings.data_dir.display()
    );

    Ok(())
}
