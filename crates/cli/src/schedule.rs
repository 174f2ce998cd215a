//! Hourly trigger
//!
//! Fires on every top of the hour. The loop polls every 30 seconds and logs
//! a status line every 5 minutes; a failed run is logged and the loop keeps
//! going.

use std::thread;
use std::time::Duration as StdDuration;

use airq_facade::{Clock, ForecastService, RunError};
use chrono::{Duration, NaiveDateTime, Timelike};
use tracing::{error, info, warn};

pub const POLL_INTERVAL: StdDuration = StdDuration::from_secs(30);
pub const STATUS_INTERVAL_SECS: i64 = 300;

/// First top of the hour strictly after `now`.
pub fn next_top_of_hour(now: NaiveDateTime) -> NaiveDateTime {
    let hour_start = now.date().and_hms_opt(now.hour(), 0, 0).unwrap_or(now);
    hour_start + Duration::hours(1)
}

/// Whole minutes from `now` until `next`.
pub fn minutes_until(now: NaiveDateTime, next: NaiveDateTime) -> i64 {
    (next - now).num_minutes()
}

/// Bookkeeping for the hourly loop.
#[derive(Debug, Clone)]
pub struct HourlySchedule {
    next_run: NaiveDateTime,
    last_status: NaiveDateTime,
}

impl HourlySchedule {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            next_run: next_top_of_hour(now),
            last_status: now,
        }
    }

    pub fn next_run(&self) -> NaiveDateTime {
        self.next_run
    }

    /// Whether a run is due; advances to the following hour when it is.
    pub fn poll(&mut self, now: NaiveDateTime) -> bool {
        if now < self.next_run {
            return false;
        }
        self.next_run = next_top_of_hour(now);
        true
    }

    /// Whether a status line is due; resets the status timer when it is.
    pub fn status_due(&mut self, now: NaiveDateTime) -> bool {
        if (now - self.last_status).num_seconds() < STATUS_INTERVAL_SECS {
            return false;
        }
        self.last_status = now;
        true
    }
}

fn run_logged(service: &ForecastService) {
    match service.run_once() {
        Ok(outcome) if outcome.is_persisted() => {}
        Ok(_) => warn!("Forecast produced but not recorded"),
        Err(RunError::SourceUnavailable(e)) => warn!(error = %e, "Run skipped"),
        Err(e) => error!(error = %e, "Run failed"),
    }
}

/// Run `service` every hour until the process is stopped.
pub fn run_hourly(service: &ForecastService, clock: &dyn Clock, run_now: bool) {
    let now = clock.now();
    let mut schedule = HourlySchedule::new(now);
    info!(
        next = %schedule.next_run().format("%H:%M"),
        minutes = minutes_until(now, schedule.next_run()),
        "Hourly forecast schedule started"
    );

    if run_now {
        run_logged(service);
    }

    loop {
        let now = clock.now();
        if schedule.poll(now) {
            run_logged(service);
        }
        if schedule.status_due(now) {
            info!(
                next = %schedule.next_run().format("%H:%M"),
                minutes = minutes_until(now, schedule.next_run()),
                "Waiting for next forecast"
            );
        }
        thread::sleep(POLL_INTERVAL);
    }
}
