use crate::config::ScheduleMode;
use crate::error::CaptureError;
use chrono::prelude::*;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::info;
use std::time::{Duration, Instant};

/// Next occurrence of `at`, today if still ahead of `now`, otherwise tomorrow.
pub fn resolve_target(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let target = now.date().and_time(at);
    if target <= now {
        target + chrono::Duration::days(1)
    } else {
        target
    }
}

pub fn wait_interval(mode: ScheduleMode, now: NaiveDateTime) -> Duration {
    match mode {
        ScheduleMode::At(at) => (resolve_target(now, at) - now)
            .to_std()
            .unwrap_or_default(),
        ScheduleMode::After(delay) => delay,
        ScheduleMode::Immediately => Duration::from_secs(0),
    }
}

/// Blocks until the scheduled start. A message on `cancel` aborts the wait.
pub fn wait(mode: ScheduleMode, cancel: &Receiver<()>) -> Result<(), CaptureError> {
    let now = Local::now().naive_local();
    let interval = wait_interval(mode, now);
    match mode {
        ScheduleMode::At(at) => info!(
            "[ Scheduler ] Waiting {:.1}s until {} …",
            interval.as_secs_f64(),
            resolve_target(now, at).time()
        ),
        ScheduleMode::After(_) => info!(
            "[ Scheduler ] Waiting {:.1}s from now …",
            interval.as_secs_f64()
        ),
        ScheduleMode::Immediately => return Ok(()),
    }
    sleep_or_cancel(interval, cancel)
}

fn sleep_or_cancel(interval: Duration, cancel: &Receiver<()>) -> Result<(), CaptureError> {
    let deadline = match Instant::now().checked_add(interval) {
        Some(deadline) => deadline,
        // past any representable instant, only a cancel can end it
        None => {
            return match cancel.recv() {
                Ok(()) => Err(CaptureError::Cancelled),
                Err(_) => {
                    std::thread::sleep(interval);
                    Ok(())
                }
            }
        }
    };
    match cancel.recv_timeout(interval) {
        Ok(()) => Err(CaptureError::Cancelled),
        Err(RecvTimeoutError::Timeout) => Ok(()),
        Err(RecvTimeoutError::Disconnected) => {
            // nobody can cancel anymore
            std::thread::sleep(deadline.saturating_duration_since(Instant::now()));
            Ok(())
        }
    }
}
