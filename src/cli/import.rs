//! Transaction import command.

use std::path::Path;

use anyhow::Context;
use console::style;

use crate::config::Settings;
use crate::models::SourceTransaction;

/// Import source transactions for a tenant from a JSON array file.
pub async fn cmd_import(
    settings: &Settings,
    tenant: &str,
    file: &Path,
    replace: bool,
) -> anyhow::Result<()> {
    anyhow::ensure!(!tenant.trim().is_empty(), "tenant must not be empty");

    settings.ensure_data_dir()?;
    let ctx = settings.create_db_context();
    ctx.init_schema().await?;

    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let txns: Vec<SourceTransaction> =
        serde_json::from_str(&raw).context("file must be a JSON array of transactions")?;
    anyhow::ensure!(!txns.is_empty(), "no transactions in {}", file.display());

    let repo = ctx.transactions();
    if replace {
        let removed = repo.clear_tenant(tenant).await?;
        if removed > 0 {
            println!(
                "{} Removed {} previously imported transactions",
                style("→").cyan(),
                removed
            );
        }
    }

    let imported = repo.import_batch(tenant, &txns).await?;
    println!(
        "{} Imported {} transactions for {}",
        style("✓").green(),
        imported,
        tenant
    );
    Ok(())
}
