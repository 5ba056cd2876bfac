//! The daemon's periodic scheduler.
//!
//! One loop drives every named task at its own minimum interval, in tier
//! order. Tasks run sequentially within an iteration, so a tier only starts
//! once the previous tier's worker pool has fully drained (the cross-tier
//! barrier), while items inside a tier run concurrently in the pool.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use tokio_util::sync::CancellationToken;

use crate::tasks::{self, TaskContext};

pub const MAKE_IMAGES: &str = "make_images";
pub const MAKE_LATEST_IMAGES: &str = "make_latest_images";
pub const MAKE_VIDEO_SEGMENTS: &str = "make_video_segments";
pub const MAKE_LATEST_VIDEOS: &str = "make_latest_videos";
pub const MAKE_DAILY_VIDEOS: &str = "make_daily_videos";

/// Last-run bookkeeping: a task never runs more often than its interval.
pub struct TaskClock {
    intervals: Vec<(&'static str, Duration)>,
    last_run: Mutex<HashMap<&'static str, DateTime<Utc>>>,
}

impl TaskClock {
    pub fn new(intervals: Vec<(&'static str, Duration)>) -> Self {
        TaskClock {
            intervals,
            last_run: Mutex::new(HashMap::new()),
        }
    }

    /// The production schedule.
    pub fn standard() -> Self {
        Self::new(vec![
            (MAKE_IMAGES, Duration::minutes(5)),
            (MAKE_LATEST_IMAGES, Duration::minutes(5)),
            (MAKE_VIDEO_SEGMENTS, Duration::minutes(10)),
            (MAKE_LATEST_VIDEOS, Duration::minutes(10)),
            (MAKE_DAILY_VIDEOS, Duration::hours(12)),
        ])
    }

    fn interval(&self, name: &str) -> Duration {
        self.intervals
            .iter()
            .find(|(task, _)| *task == name)
            .map(|(_, interval)| *interval)
            .unwrap_or_else(Duration::zero)
    }

    /// Is `last_run + min_interval <= now`? A task that never ran is due.
    pub fn due(&self, name: &str, now: DateTime<Utc>) -> bool {
        match self.last_run.lock().unwrap().get(name) {
            Some(last) => *last + self.interval(name) <= now,
            None => true,
        }
    }

    pub fn mark_ran(&self, name: &'static str, now: DateTime<Utc>) {
        self.last_run.lock().unwrap().insert(name, now);
    }

    /// Earliest instant any task becomes due again; `now` if one already is.
    pub fn next_wake(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let last_run = self.last_run.lock().unwrap();
        self.intervals
            .iter()
            .map(|(name, interval)| match last_run.get(name) {
                Some(last) => *last + *interval,
                None => now,
            })
            .min()
            .unwrap_or(now)
    }
}

/// Run the scheduler loop until the cancellation token fires.
pub async fn run(ctx: Arc<TaskContext>, cancel: CancellationToken) {
    let clock = TaskClock::standard();
    info!("Starting scheduler loop");

    while !cancel.is_cancelled() {
        // Each task samples its own clock: an earlier tier's long pass must
        // not shift a later tier's window into the past.
        let now = Utc::now();
        if clock.due(MAKE_IMAGES, now) {
            clock.mark_ran(MAKE_IMAGES, now);
            let built = tasks::images::make_images(&ctx, now).await;
            for image in &built {
                ctx.propagator.on_image_built(&ctx.state, image);
            }
        }

        let now = Utc::now();
        if clock.due(MAKE_LATEST_IMAGES, now) {
            clock.mark_ran(MAKE_LATEST_IMAGES, now);
            tasks::latest_images::make_latest_images(&ctx).await;
        }

        let now = Utc::now();
        if clock.due(MAKE_VIDEO_SEGMENTS, now) {
            clock.mark_ran(MAKE_VIDEO_SEGMENTS, now);
            let built = tasks::segments::make_video_segments(&ctx, now).await;
            for segment in &built {
                ctx.propagator
                    .on_segment_built(&ctx.state, &ctx.config, segment, now);
            }
        }

        let now = Utc::now();
        if clock.due(MAKE_LATEST_VIDEOS, now) {
            clock.mark_ran(MAKE_LATEST_VIDEOS, now);
            tasks::latest_videos::make_latest_videos(&ctx, now).await;
        }

        let now = Utc::now();
        if clock.due(MAKE_DAILY_VIDEOS, now) {
            clock.mark_ran(MAKE_DAILY_VIDEOS, now);
            tasks::daily_videos::make_daily_videos(&ctx, now).await;
        }

        ctx.state
            .poison
            .evict_older_than(Duration::hours(ctx.config.window_hours));

        let next_wake = clock.next_wake(Utc::now());
        debug!("Next scheduler pass at {}", next_wake);
        while Utc::now() < next_wake && !cancel.is_cancelled() {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(std::time::Duration::from_secs(1)) => {}
            }
        }
    }

    info!("Scheduler loop stopped");
}
