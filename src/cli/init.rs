//! Database initialization command.

use console::style;

use crate::config::Settings;

/// Initialize the data directory and database schema.
pub async fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    settings.ensure_data_dir()?;

    let ctx = settings.create_db_context();
    ctx.init_schema().await?;

    println!(
        "{} Initialized {}",
        style("✓").green(),
        settings.data_dir.display()
    );
    Ok(())
}
