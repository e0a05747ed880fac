use crate::backfill::BackfillJob;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

/// Start a scheduler running the backfill job on `schedule`
/// (six-field cron: "second minute hour day month day_of_week", UTC).
pub async fn start_scheduler(job: Arc<BackfillJob>, schedule: &str) -> Result<JobScheduler> {
    validate_schedule(schedule)?;
    let scheduler = JobScheduler::new().await?;

    info!("Scheduling translation backfill (cron: {})", schedule);
    let cron_job = Job::new_async(schedule, move |_uuid, _l| {
        let job = Arc::clone(&job);

        Box::pin(async move {
            info!("⏰ Scheduled backfill triggered");
            let report = job.run().await;
            if report.errors > 0 || !report.catalog_errors.is_empty() {
                error!(
                    "Scheduled backfill finished with {} failed pair(s) and {} catalog error(s)",
                    report.errors,
                    report.catalog_errors.len()
                );
            }
        })
    })
    .with_context(|| format!("Invalid backfill schedule: {}", schedule))?;

    scheduler.add(cron_job).await?;
    scheduler.start().await?;
    info!("✓ Scheduler started");

    Ok(scheduler)
}

/// Reject anything but a six-field cron expression.
fn validate_schedule(schedule: &str) -> Result<()> {
    let fields = schedule.split_whitespace().count();
    if fields != 6 {
        anyhow::bail!(
            "Invalid cron expression '{}': expected 6 fields (sec min hour day month weekday), got {}",
            schedule,
            fields
        );
    }
    Ok(())
}
