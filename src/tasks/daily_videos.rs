//! DailyVideo tier: a 24-hour MP4 anchored at each half-day boundary,
//! concatenated from the hourly segments starting at the anchor.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use log::{info, warn};

use crate::processors::Toolset;
use crate::processors::video::EncodeOptions;
use crate::store::{ArtifactStore, Channel};
use crate::sweep::sweep_daily_videos;
use crate::tasks::TaskContext;

pub async fn make_daily_videos(ctx: &TaskContext, now: DateTime<Utc>) {
    let start_time = Instant::now();
    sweep_daily_videos(&ctx.config, &ctx.store, &ctx.state, now);

    let pending = ctx.state.daily_videos.drain();
    if pending.is_empty() {
        return;
    }
    let count = pending.len();

    for (channel, anchor) in pending {
        let store = ctx.store.clone();
        let tools = ctx.tools.clone();
        let frame_rate = ctx.config.frame_rate;
        ctx.pool.submit(
            format!("daily video {:04} {}", channel, anchor),
            move || encode_one(&store, &tools, channel, anchor, frame_rate),
        );
    }
    ctx.pool.run_all().await;

    let duration = format!("{:?}", start_time.elapsed());
    info!(duration = &*duration; "Daily video pass finished ({} pending).", count);
}

fn encode_one(
    store: &ArtifactStore,
    tools: &Toolset,
    channel: Channel,
    anchor: DateTime<Utc>,
    frame_rate: u32,
) -> Result<()> {
    let segments = anchored_segments(store, channel, anchor);
    if segments.is_empty() {
        warn!(
            "No video segments found to make daily video for {} and channel {}, skipping!",
            anchor, channel
        );
        return Ok(());
    }

    let output = store.daily_video_path(channel, anchor);
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("cannot create directory {:?}", parent))?;
    }

    let mut options = EncodeOptions::with_frame_rate(frame_rate);
    options.title = Some(format!(
        "Video of AIA {} from {} to {}",
        channel,
        anchor.format("%Y-%m-%dT%H:%M:%S"),
        (anchor + Duration::hours(24)).format("%Y-%m-%dT%H:%M:%S")
    ));

    info!("Making daily video {:?}", output);
    tools
        .encoder
        .concat_to_mp4(&segments, &output, &options)
        .with_context(|| {
            format!(
                "error while making daily video for {} and channel {}",
                anchor, channel
            )
        })
}

/// The 24 hourly segments in `[anchor, anchor + 24h)`, in hour order;
/// missing hours are logged and omitted.
fn anchored_segments(
    store: &ArtifactStore,
    channel: Channel,
    anchor: DateTime<Utc>,
) -> Vec<PathBuf> {
    (0..24i64)
        .filter_map(|offset| {
            let path = store.segment_path(channel, anchor + Duration::hours(offset));
            if path.is_file() {
                Some(path)
            } else {
                warn!("Video segment {:?} not found, skipping!", path);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::Config;
    use chrono::TimeZone;

    #[test]
    fn anchored_segments_are_in_hour_order_without_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.segments_root = dir.path().to_path_buf();
        let store = ArtifactStore::new(&config);
        let anchor = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        for offset in 0..24 {
            let path = store.segment_path(193, anchor + Duration::hours(offset));
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, b"x").unwrap();
        }

        let segments = anchored_segments(&store, 193, anchor);
        assert_eq!(segments.len(), 24);
        let mut sorted = segments.clone();
        sorted.sort();
        assert_eq!(segments, sorted);
        sorted.dedup();
        assert_eq!(sorted.len(), 24);
    }

    #[test]
    fn missing_hours_are_omitted() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.segments_root = dir.path().to_path_buf();
        let store = ArtifactStore::new(&config);
        let anchor = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

        for offset in [0, 5, 23] {
            let path = store.segment_path(94, anchor + Duration::hours(offset));
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, b"x").unwrap();
        }

        assert_eq!(anchored_segments(&store, 94, anchor).len(), 3);
    }
}
