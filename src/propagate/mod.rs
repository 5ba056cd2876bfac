//! Dependency propagation between artifact tiers.
//!
//! A completed artifact in one tier maps to the rebuild buckets of the tiers
//! that consume it: images feed hourly video segments, segments feed the
//! half-day-anchored daily videos and the per-channel latest video.

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};

use crate::common::config::Config;
use crate::state::SharedState;
use crate::store::{Channel, half_day_anchor, hour_bucket};

/// A successfully converted image, as reported by the image tier.
#[derive(Debug, Clone)]
pub struct BuiltImage {
    pub channel: Channel,
    pub observed: DateTime<Utc>,
    pub path: PathBuf,
}

/// A successfully encoded hourly video segment.
#[derive(Debug, Clone)]
pub struct BuiltSegment {
    pub channel: Channel,
    pub hour: DateTime<Utc>,
    pub path: PathBuf,
}

/// Does `hour` contribute to the latest video of length `window_hours` at `now`?
/// The boundary is inclusive: a segment exactly `window_hours` old still counts.
pub fn in_latest_window(hour: DateTime<Utc>, now: DateTime<Utc>, window_hours: i64) -> bool {
    hour >= hour_bucket(now) - Duration::hours(window_hours)
}

#[derive(Debug, Clone, Copy)]
pub struct DependencyPropagator;

impl DependencyPropagator {
    /// A built image makes its hour's video segment stale and becomes a
    /// latest-image candidate for its channel.
    pub fn on_image_built(&self, state: &SharedState, image: &BuiltImage) {
        state
            .segments
            .insert((image.channel, hour_bucket(image.observed)));
        state.latest_images.offer(image.clone());
    }

    /// A built segment makes the half-day video containing its hour stale,
    /// and the channel's latest video if the hour falls inside the window.
    pub fn on_segment_built(
        &self,
        state: &SharedState,
        config: &Config,
        segment: &BuiltSegment,
        now: DateTime<Utc>,
    ) {
        state
            .daily_videos
            .insert((segment.channel, half_day_anchor(segment.hour)));

        let window = config.latest_window_hours(segment.channel);
        if in_latest_window(segment.hour, now, window) {
            state.latest_videos.insert(segment.channel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, m, 0).unwrap()
    }

    #[test]
    fn image_inserts_exactly_one_segment_bucket() {
        let state = SharedState::new();
        let image = BuiltImage {
            channel: 171,
            observed: at(5, 37),
            path: PathBuf::from("a.png"),
        };

        DependencyPropagator.on_image_built(&state, &image);

        let buckets = state.segments.drain();
        assert_eq!(buckets, vec![(171, at(5, 0))]);
    }

    #[test]
    fn segment_maps_to_containing_half_day() {
        let state = SharedState::new();
        let config = Config::default();
        let segment = BuiltSegment {
            channel: 193,
            hour: at(13, 0),
            path: PathBuf::from("a.ts"),
        };

        DependencyPropagator.on_segment_built(&state, &config, &segment, at(14, 0));

        assert_eq!(state.daily_videos.drain(), vec![(193, at(12, 0))]);
    }

    #[test]
    fn segment_inside_window_triggers_latest_rebuild() {
        let state = SharedState::new();
        let config = Config::default();
        let now = Utc.with_ymd_and_hms(2024, 1, 3, 10, 0, 0).unwrap();
        let segment = BuiltSegment {
            channel: 171,
            hour: now - Duration::hours(24),
            path: PathBuf::from("a.ts"),
        };

        DependencyPropagator.on_segment_built(&state, &config, &segment, now);
        assert_eq!(state.latest_videos.drain(), vec![171]);
    }

    #[test]
    fn segment_outside_window_does_not_trigger_latest_rebuild() {
        let state = SharedState::new();
        let config = Config::default();
        let now = Utc.with_ymd_and_hms(2024, 1, 3, 10, 0, 0).unwrap();
        let segment = BuiltSegment {
            channel: 171,
            hour: now - Duration::hours(25),
            path: PathBuf::from("a.ts"),
        };

        DependencyPropagator.on_segment_built(&state, &config, &segment, now);
        assert!(state.latest_videos.is_empty());
        // The daily bucket is still inserted regardless of the window.
        assert_eq!(state.daily_videos.len(), 1);
    }

    #[test]
    fn channel_4500_uses_its_longer_window() {
        let state = SharedState::new();
        let config = Config::default();
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let segment = BuiltSegment {
            channel: 4500,
            hour: now - Duration::hours(200),
            path: PathBuf::from("a.ts"),
        };

        DependencyPropagator.on_segment_built(&state, &config, &segment, now);
        assert_eq!(state.latest_videos.drain(), vec![4500]);
    }
}
