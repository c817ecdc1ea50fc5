//! Job status command.

use console::style;

use crate::config::Settings;

/// Print the classification checkpoint for a tenant.
pub async fn cmd_status(settings: &Settings, tenant: &str) -> anyhow::Result<()> {
    let ctx = settings.create_db_context();
    ctx.init_schema().await?;

    match ctx.jobs().get(tenant).await? {
        Some(job) => {
            println!("{} {}", style("Status:").bold(), job.status.api_str());
            println!(
                "{} {}/{} ({:.1}%)",
                style("Progress:").bold(),
                job.processed_count,
                job.total_items,
                job.progress_percent()
            );
            println!(
                "{} {}",
                style("Updated:").bold(),
                job.updated_at.to_rfc3339()
            );
            if let Some(error) = &job.last_error {
                println!("{} {}", style("Last error:").bold(), error);
            }
        }
        None => println!("No classification job for {} yet", tenant),
    }
    Ok(())
}
