//! Local classification command: the pull driver run as a CLI loop.

use std::sync::Arc;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::classifier::LlmClassifier;
use crate::config::Settings;
use crate::models::BusinessContext;
use crate::pipeline::{
    clamp_batch_size, estimate_chunk_cost, run_step, ProgressTracker, StepContext,
};
use crate::server::ReportCache;

/// Step a tenant's job chunk by chunk until the checkpoint reports complete.
pub async fn cmd_classify(
    settings: &Settings,
    tenant: &str,
    batch_size: Option<u32>,
    context: BusinessContext,
) -> anyhow::Result<()> {
    anyhow::ensure!(!tenant.trim().is_empty(), "tenant must not be empty");

    settings.ensure_data_dir()?;
    let ctx = settings.create_db_context();
    ctx.init_schema().await?;

    let classifier = Arc::new(LlmClassifier::new(settings.classifier.clone()));
    if !classifier.is_available().await {
        println!(
            "{} Classifier endpoint {} is not responding",
            style("!").yellow(),
            settings.classifier.endpoint
        );
    }

    let step_ctx = StepContext {
        transactions: ctx.transactions(),
        records: ctx.classifications(),
        ledger: ctx.ledger(),
        tracker: ProgressTracker::new(ctx.jobs()),
        classifier,
        hook: Arc::new(ReportCache::new()),
        concurrency: settings.classifier.concurrency,
    };

    let total = step_ctx.transactions.count_for_tenant(tenant).await? as usize;
    anyhow::ensure!(
        total > 0,
        "no cached transactions for tenant {} - run `taxlens import` first",
        tenant
    );

    let estimate = estimate_chunk_cost(total);
    println!(
        "{} Classifying {} transactions for {} (estimated ${:.4})",
        style("→").cyan(),
        total,
        tenant,
        estimate.estimated_cost_usd
    );

    let bar = ProgressBar::new(total as u64);
    bar.set_style(ProgressStyle::with_template(
        "{bar:40.cyan/blue} {pos}/{len} {msg}",
    )?);

    let size = clamp_batch_size(batch_size);
    let mut batch: u32 = 0;
    loop {
        let base = batch as usize * size as usize;
        let outcome = run_step(&step_ctx, tenant, batch, batch_size, &context, |done, _| {
            bar.set_position((base + done) as u64);
        })
        .await?;

        bar.set_position(outcome.total_analyzed.max(0) as u64);
        if outcome.all_complete {
            break;
        }
        batch = outcome.next_batch.unwrap_or(batch + 1);
    }
    bar.finish_with_message("complete");

    let recorded = step_ctx.ledger.total_cost(tenant).await?;
    println!(
        "{} Classification complete ({} transactions, ${:.4} estimated spend)",
        style("✓").green(),
        total,
        recorded
    );
    Ok(())
}
