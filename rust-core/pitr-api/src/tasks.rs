// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recurring background work: live WAL shipping, the nightly archive of the
// previous day, and the one-off startup reconciliation. The tasks share
// nothing but the archive store.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, NaiveTime, Utc};
use pitr_heal::{ArchiveEngine, ReconciliationReport, WalShipper};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info};

/// Nightly archive time of day, UTC.
pub const NIGHTLY_ARCHIVE_AT: (u32, u32) = (0, 5);

/// Ship the spool every `every`, starting one period from now.
pub fn spawn_shipper(shipper: WalShipper, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(spool = %shipper.spool().display(), interval_secs = every.as_secs(), "WAL shipper started");
        let mut ticker = interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(err) = shipper.ship_once().await {
                error!(error = %err, "WAL shipping pass failed");
            }
        }
    })
}

/// First nightly run strictly after `now`.
pub fn next_nightly_run(now: DateTime<Utc>) -> DateTime<Utc> {
    let (hour, minute) = NIGHTLY_ARCHIVE_AT;
    let at = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
    let today = now.date_naive().and_time(at).and_utc();
    if today > now {
        today
    } else {
        now.date_naive()
            .checked_add_days(Days::new(1))
            .map(|d| d.and_time(at).and_utc())
            .unwrap_or(today)
    }
}

/// Archive yesterday every night at [`NIGHTLY_ARCHIVE_AT`].
pub fn spawn_nightly_archive(engine: Arc<ArchiveEngine>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = engine.clock().now();
            let next = next_nightly_run(now);
            info!(next_run = %next, "Nightly archive scheduled");
            let wait = (next - now).to_std().unwrap_or(Duration::from_secs(60));
            tokio::time::sleep(wait).await;

            match engine.archive_yesterday().await {
                Some(report) if report.is_failure() => error!(
                    day = %report.day,
                    error = report.error.as_deref().unwrap_or("unknown"),
                    "Nightly archive failed"
                ),
                Some(report) => info!(day = %report.day, outcome = ?report.outcome, "Nightly archive done"),
                None => {}
            }
        }
    })
}

/// Reconcile every historical day once.
pub fn spawn_startup_reconciliation(engine: Arc<ArchiveEngine>) -> JoinHandle<ReconciliationReport> {
    tokio::spawn(async move { engine.run_startup_reconciliation().await })
}
