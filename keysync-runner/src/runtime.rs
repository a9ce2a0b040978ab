use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use keysync_core::config::RunnerSettings;
use keysync_core::{
    ApartmentConfig, ApartmentId, BookingSource, FailureKind, LockGateway, ReconciliationResult,
};
use keysync_report::{aggregate, RunReport};
use keysync_sync::{run_apartment, ReconcileOptions};

use crate::error::RunnerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Apartments processed at the same time.
    pub workers: usize,
    /// Time budget of one apartment's unit of work. No lock write starts
    /// once it is spent.
    pub unit_timeout: Duration,
    pub reconcile: ReconcileOptions,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from_settings(&RunnerSettings::default(), false)
    }
}

impl RunOptions {
    pub fn from_settings(settings: &RunnerSettings, dry_run: bool) -> Self {
        Self {
            workers: settings.workers,
            unit_timeout: Duration::from_secs(settings.unit_timeout_secs),
            reconcile: ReconcileOptions {
                tolerance: Duration::from_secs(settings.tolerance_secs),
                dry_run,
                force_sync_after_change: settings.force_sync_after_change,
                deadline: None,
            },
        }
    }
}

/// Build a multi-thread runtime and block on [`run_once`].
pub fn run_once_blocking(
    apartments: BTreeMap<ApartmentId, ApartmentConfig>,
    now: NaiveDateTime,
    bookings: Arc<dyn BookingSource>,
    gateway: Arc<dyn LockGateway>,
    opts: RunOptions,
) -> Result<RunReport, RunnerError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(RunnerError::Runtime)?;
    Ok(runtime.block_on(run_once(apartments, now, bookings, gateway, opts)))
}

/// Reconcile every apartment once, at most `opts.workers` at a time.
///
/// Each unit runs on a blocking thread holding its worker permit. A unit that
/// overruns `opts.unit_timeout` is logged and still awaited, so every entry is
/// what actually happened to the lock. Entries come back in apartment id order.
pub async fn run_once(
    apartments: BTreeMap<ApartmentId, ApartmentConfig>,
    now: NaiveDateTime,
    bookings: Arc<dyn BookingSource>,
    gateway: Arc<dyn LockGateway>,
    opts: RunOptions,
) -> RunReport {
    let workers = opts.workers.max(1);
    tracing::info!(apartments = apartments.len(), workers, %now, dry_run = opts.reconcile.dry_run, "run started");

    let permits = Arc::new(Semaphore::new(workers));
    let ids: Vec<ApartmentId> = apartments.keys().cloned().collect();
    let mut slots: Vec<Option<ReconciliationResult>> = vec![None; ids.len()];
    let mut units = JoinSet::new();

    for (index, apartment) in apartments.into_values().enumerate() {
        let permits = permits.clone();
        let bookings = bookings.clone();
        let gateway = gateway.clone();
        units.spawn(async move {
            let result = run_unit(apartment, now, bookings, gateway, permits, opts).await;
            (index, result)
        });
    }

    while let Some(joined) = units.join_next().await {
        match joined {
            Ok((index, result)) => slots[index] = Some(result),
            Err(err) => tracing::error!(error = %err, "unit task join failure"),
        }
    }

    let results = slots.into_iter().zip(ids).map(|(slot, id)| {
        slot.unwrap_or_else(|| {
            ReconciliationResult::failed(id, FailureKind::Internal, "unit produced no result")
        })
    });
    let report = aggregate(results);
    tracing::info!(status = %report.overall_status, failed = report.failed().count(), "run finished");
    report
}

async fn run_unit(
    apartment: ApartmentConfig,
    now: NaiveDateTime,
    bookings: Arc<dyn BookingSource>,
    gateway: Arc<dyn LockGateway>,
    permits: Arc<Semaphore>,
    opts: RunOptions,
) -> ReconciliationResult {
    let id = apartment.id.clone();
    let permit = match permits.acquire_owned().await {
        Ok(permit) => permit,
        Err(err) => {
            return ReconciliationResult::failed(id, FailureKind::Internal, err.to_string());
        }
    };

    let reconcile_opts = ReconcileOptions {
        deadline: Some(Instant::now() + opts.unit_timeout),
        ..opts.reconcile
    };
    let mut work = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        run_apartment(
            &apartment,
            bookings.as_ref(),
            gateway.as_ref(),
            now,
            &reconcile_opts,
        )
    });

    let joined = match tokio::time::timeout(opts.unit_timeout, &mut work).await {
        Ok(joined) => joined,
        Err(_) => {
            tracing::warn!(
                apartment = %id,
                timeout_secs = opts.unit_timeout.as_secs_f64(),
                "unit over its time budget, waiting for the lock call in flight"
            );
            work.await
        }
    };
    match joined {
        Ok(result) => result,
        Err(err) => {
            tracing::error!(apartment = %id, error = %err, "unit crashed");
            ReconciliationResult::failed(id, FailureKind::Internal, format!("unit crashed: {err}"))
        }
    }
}

/// Install the global subscriber: `RUST_LOG` if set, `info` otherwise.
/// A second call is a no-op.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
