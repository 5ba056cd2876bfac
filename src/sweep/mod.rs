//! Freshness sweep: recompute the expected artifact set over the rolling
//! window and flag every missing artifact for rebuild.
//!
//! The sweep is independent of live propagation; it repairs artifacts lost to
//! crashes, partial writes or missed events. Each tier task runs its sweep
//! right before draining the tier's rebuild set, so sweep and propagation
//! entries collapse in the same set.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};

use crate::common::CHANNELS;
use crate::common::config::Config;
use crate::state::SharedState;
use crate::store::{ArtifactStore, Tier, half_day_anchor, hour_bucket};

/// Flag every (channel, hour) in the window whose segment is missing.
pub fn sweep_segments(
    config: &Config,
    store: &ArtifactStore,
    state: &SharedState,
    now: DateTime<Utc>,
) {
    let mut missing = 0usize;
    let start = hour_bucket(now) - Duration::hours(config.window_hours);
    for &channel in CHANNELS {
        let mut hour = start;
        while hour <= now {
            if !store.segment_exists(channel, hour) {
                info!(
                    "Video segment {:?} is missing, will be made",
                    store.segment_path(channel, hour)
                );
                if state.segments.insert((channel, hour)) {
                    missing += 1;
                }
            }
            hour += Duration::hours(1);
        }
    }
    debug!("{:?} sweep flagged {} missing artifacts", Tier::VideoSegment, missing);
}

/// Flag every (channel, half-day anchor) in the window whose daily video is missing.
pub fn sweep_daily_videos(
    config: &Config,
    store: &ArtifactStore,
    state: &SharedState,
    now: DateTime<Utc>,
) {
    let mut missing = 0usize;
    let start = half_day_anchor(hour_bucket(now) - Duration::hours(config.window_hours));
    for &channel in CHANNELS {
        let mut anchor = start;
        while anchor <= now {
            if !store.daily_video_exists(channel, anchor) {
                info!(
                    "Daily video {:?} is missing, will be made",
                    store.daily_video_path(channel, anchor)
                );
                if state.daily_videos.insert((channel, anchor)) {
                    missing += 1;
                }
            }
            anchor += Duration::hours(12);
        }
    }
    debug!("{:?} sweep flagged {} missing artifacts", Tier::DailyVideo, missing);
}

/// Flag every channel whose public latest video is missing.
pub fn sweep_latest_videos(store: &ArtifactStore, state: &SharedState) {
    let mut missing = 0usize;
    for &channel in CHANNELS {
        if !store.latest_video_exists(channel) {
            info!(
                "Latest video {:?} is missing, will be made",
                store.latest_video_path(channel)
            );
            if state.latest_videos.insert(channel) {
                missing += 1;
            }
        }
    }
    debug!("{:?} sweep flagged {} missing artifacts", Tier::LatestVideo, missing);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};
    use std::fs;

    fn setup() -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.fits_root = dir.path().join("fits");
        config.images_root = dir.path().join("images");
        config.segments_root = dir.path().join("segments");
        config.videos_root = dir.path().join("videos");
        config.window_hours = 2;
        (dir, config)
    }

    fn touch(path: &std::path::Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn segment_sweep_flags_only_missing_buckets() {
        let (_dir, config) = setup();
        let store = ArtifactStore::new(&config);
        let state = SharedState::new();
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap();

        // Window covers hours 08, 09, 10; hour 09 exists for every channel.
        for &channel in CHANNELS {
            touch(&store.segment_path(channel, now - Duration::hours(1)));
        }

        sweep_segments(&config, &store, &state, now);

        let buckets = state.segments.drain();
        assert_eq!(buckets.len(), CHANNELS.len() * 2);
        assert!(!buckets.contains(&(171, now - Duration::hours(1))));
        assert!(buckets.contains(&(171, now)));
        assert!(buckets.contains(&(171, now - Duration::hours(2))));
    }

    #[test]
    fn sweep_with_no_missing_artifacts_flags_nothing() {
        let (_dir, config) = setup();
        let store = ArtifactStore::new(&config);
        let state = SharedState::new();
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap();

        for &channel in CHANNELS {
            for back in 0..=config.window_hours {
                touch(&store.segment_path(channel, now - Duration::hours(back)));
            }
            touch(&store.latest_video_path(channel));
        }

        sweep_segments(&config, &store, &state, now);
        sweep_latest_videos(&store, &state);
        assert!(state.segments.is_empty());
        assert!(state.latest_videos.is_empty());
    }

    #[test]
    fn daily_sweep_steps_anchors_every_twelve_hours() {
        let (_dir, mut config) = setup();
        config.window_hours = 24;
        let store = ArtifactStore::new(&config);
        let state = SharedState::new();
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 13, 0, 0).unwrap();

        sweep_daily_videos(&config, &store, &state, now);

        let anchors: Vec<DateTime<Utc>> = state
            .daily_videos
            .drain()
            .into_iter()
            .filter(|(channel, _)| *channel == 94)
            .map(|(_, anchor)| anchor)
            .collect();
        // Window start 2024-01-01T13:00 anchors at 12:00; anchors at 12:00,
        // 00:00 and 12:00 the next day.
        assert_eq!(anchors.len(), 3);
        for anchor in anchors {
            assert!(anchor.hour() == 0 || anchor.hour() == 12);
        }
    }

    #[test]
    fn latest_sweep_flags_channels_without_public_video() {
        let (_dir, config) = setup();
        let store = ArtifactStore::new(&config);
        let state = SharedState::new();

        touch(&store.latest_video_path(171));
        sweep_latest_videos(&store, &state);

        let channels = state.latest_videos.drain();
        assert_eq!(channels.len(), CHANNELS.len() - 1);
        assert!(!channels.contains(&171));
    }
}
