//! VideoSegment tier: one lossless `.ts` segment per (channel, hour) from
//! that hour's converted images.

use std::fs;
use std::mem;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{info, warn};
use walkdir::WalkDir;

use crate::processors::video::EncodeOptions;
use crate::propagate::BuiltSegment;
use crate::store::{ArtifactStore, Channel};
use crate::sweep::sweep_segments;
use crate::tasks::TaskContext;

/// Sweep the window for missing segments, drain the rebuild set and encode
/// each pending (channel, hour). Returns the segments built in this pass.
pub async fn make_video_segments(ctx: &TaskContext, now: DateTime<Utc>) -> Vec<BuiltSegment> {
    let start_time = Instant::now();
    sweep_segments(&ctx.config, &ctx.store, &ctx.state, now);

    let pending = ctx.state.segments.drain();
    if pending.is_empty() {
        return Vec::new();
    }
    let built = Arc::new(Mutex::new(Vec::new()));

    for (channel, hour) in pending {
        let store = ctx.store.clone();
        let tools = ctx.tools.clone();
        let built = built.clone();
        let frame_rate = ctx.config.frame_rate;
        ctx.pool.submit(
            format!("video segment {:04} {}", channel, hour),
            move || {
                if let Some(segment) = encode_one(&store, &tools, channel, hour, frame_rate)? {
                    built.lock().unwrap().push(segment);
                }
                Ok(())
            },
        );
    }
    ctx.pool.run_all().await;

    let built = mem::take(&mut *built.lock().unwrap());
    if !built.is_empty() {
        let duration = format!("{:?}", start_time.elapsed());
        info!(duration = &*duration; "Encoded {} video segments.", built.len());
    }
    built
}

fn encode_one(
    store: &ArtifactStore,
    tools: &crate::processors::Toolset,
    channel: Channel,
    hour: DateTime<Utc>,
    frame_rate: u32,
) -> Result<Option<BuiltSegment>> {
    let frames = hour_frames(store, channel, hour);
    if frames.is_empty() {
        warn!(
            "No images found to make video segment for {} and channel {}, skipping!",
            hour, channel
        );
        return Ok(None);
    }

    let output = store.segment_path(channel, hour);
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("cannot create directory {:?}", parent))?;
    }

    info!("Making video segment {:?}", output);
    tools
        .encoder
        .frames_to_segment(&frames, &output, &EncodeOptions::with_frame_rate(frame_rate))
        .with_context(|| {
            format!(
                "error while making video segment for {} and channel {}",
                hour, channel
            )
        })?;

    Ok(Some(BuiltSegment {
        channel,
        hour,
        path: output,
    }))
}

/// The hour's frames for one channel, in chronological (name) order.
fn hour_frames(store: &ArtifactStore, channel: Channel, hour: DateTime<Utc>) -> Vec<PathBuf> {
    let suffix = format!("{:04}.quicklook.png", channel);
    let mut frames: Vec<PathBuf> = WalkDir::new(store.image_hour_dir(hour))
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(&suffix))
        })
        .collect();
    frames.sort();
    frames
}
