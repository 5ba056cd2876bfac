//! LatestVideo tier: per-channel rolling MP4 over the trailing window,
//! rebuilt wholesale and atomically promoted into its public path.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use log::{info, warn};

use crate::processors::Toolset;
use crate::processors::video::EncodeOptions;
use crate::store::{ArtifactStore, Channel, hour_bucket};
use crate::sweep::sweep_latest_videos;
use crate::tasks::TaskContext;

pub async fn make_latest_videos(ctx: &TaskContext, now: DateTime<Utc>) {
    let start_time = Instant::now();
    sweep_latest_videos(&ctx.store, &ctx.state);

    let pending = ctx.state.latest_videos.drain();
    if pending.is_empty() {
        return;
    }
    let count = pending.len();

    for channel in pending {
        let store = ctx.store.clone();
        let tools = ctx.tools.clone();
        let frame_rate = ctx.config.frame_rate;
        let window_hours = ctx.config.latest_window_hours(channel);
        ctx.pool
            .submit(format!("latest video {:04}", channel), move || {
                encode_one(&store, &tools, channel, now, window_hours, frame_rate)
            });
    }
    ctx.pool.run_all().await;

    let duration = format!("{:?}", start_time.elapsed());
    info!(duration = &*duration; "Latest video pass finished ({} pending).", count);
}

fn encode_one(
    store: &ArtifactStore,
    tools: &Toolset,
    channel: Channel,
    now: DateTime<Utc>,
    window_hours: i64,
    frame_rate: u32,
) -> Result<()> {
    let segments = window_segments(store, channel, now, window_hours);
    if segments.is_empty() {
        warn!(
            "No video segments found to make latest video for channel {}, skipping!",
            channel
        );
        return Ok(());
    }

    let public = store.latest_video_path(channel);
    let temp = ArtifactStore::temp_sibling(&public);
    if let Some(parent) = public.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("cannot create directory {:?}", parent))?;
    }

    let mut options = EncodeOptions::with_frame_rate(frame_rate);
    options.title = Some(format!(
        "Video of the last {} hours of AIA {}",
        window_hours, channel
    ));

    // Encode to a temp path so concurrent readers never observe a partially
    // written latest video.
    info!("Making latest video {:?}", public);
    tools
        .encoder
        .concat_to_mp4(&segments, &temp, &options)
        .with_context(|| format!("error while making latest video for channel {}", channel))?;

    ArtifactStore::promote(&temp, &public)
}

/// Segments contributing to the latest video: every existing hour in
/// `[now - window, now]`, oldest first. The boundary hour is inclusive.
fn window_segments(
    store: &ArtifactStore,
    channel: Channel,
    now: DateTime<Utc>,
    window_hours: i64,
) -> Vec<PathBuf> {
    let start = hour_bucket(now) - Duration::hours(window_hours);
    (0..=window_hours)
        .filter_map(|offset| {
            let path = store.segment_path(channel, start + Duration::hours(offset));
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
    fn window_boundary_is_inclusive_at_exactly_window_hours() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.segments_root = dir.path().to_path_buf();
        let store = ArtifactStore::new(&config);
        let now = Utc.with_ymd_and_hms(2024, 1, 3, 10, 0, 0).unwrap();

        for back in [24, 25] {
            let path = store.segment_path(171, now - Duration::hours(back));
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, b"x").unwrap();
        }

        let segments = window_segments(&store, 171, now, 24);
        assert_eq!(segments.len(), 1);
        assert_eq!(
            segments[0],
            store.segment_path(171, now - Duration::hours(24))
        );
    }
}
