//! Image tier: convert every acceptable FITS file in the window whose PNG
//! does not exist yet.

use std::fs;
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::common::{CHANNELS, quality_acceptable};
use crate::processors::Toolset;
use crate::propagate::BuiltImage;
use crate::state::SharedState;
use crate::store::{ArtifactStore, hour_bucket};
use crate::tasks::TaskContext;

const REQUIRED_TAGS: [&str; 3] = ["DATE-OBS", "WAVELNTH", "QUALITY"];

/// Scan the window, dispatch one conversion per pending source file, and
/// return the images built in this pass for propagation.
pub async fn make_images(ctx: &TaskContext, now: DateTime<Utc>) -> Vec<BuiltImage> {
    let start_time = Instant::now();
    let sources = discover_sources(ctx, now);
    let built = Arc::new(Mutex::new(Vec::new()));

    for source in sources {
        let state = ctx.state.clone();
        let store = ctx.store.clone();
        let tools = ctx.tools.clone();
        let built = built.clone();
        ctx.pool
            .submit(format!("image conversion {:?}", source), move || {
                if let Some(image) = convert_one(&state, &store, &tools, &source)? {
                    built.lock().unwrap().push(image);
                }
                Ok(())
            });
    }
    ctx.pool.run_all().await;

    let built = mem::take(&mut *built.lock().unwrap());
    if !built.is_empty() {
        let duration = format!("{:?}", start_time.elapsed());
        info!(duration = &*duration; "Converted {} images.", built.len());
    }
    built
}

/// Every FITS file in the rolling window, across all channels.
fn discover_sources(ctx: &TaskContext, now: DateTime<Utc>) -> Vec<PathBuf> {
    let mut sources = Vec::new();
    let start = hour_bucket(now) - Duration::hours(ctx.config.window_hours);
    for &channel in CHANNELS {
        let mut hour = start;
        while hour <= now {
            let dir = ctx.store.fits_hour_dir(channel, hour);
            debug!("Scanning source directory {:?}", dir);
            for entry in WalkDir::new(&dir)
                .min_depth(1)
                .max_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) == Some("fits") {
                    sources.push(path.to_path_buf());
                }
            }
            hour += Duration::hours(1);
        }
    }
    sources
}

/// Convert one source file, enforcing the per-item skip policy: every
/// rejection is logged here and never escapes as an error, except unreadable
/// sources and tool failures (logged by the pool, retried next sweep).
fn convert_one(
    state: &SharedState,
    store: &ArtifactStore,
    tools: &Toolset,
    source: &Path,
) -> Result<Option<BuiltImage>> {
    if state.poison.contains(source) {
        info!("Source {:?} in poison cache, skipping!", source);
        return Ok(None);
    }

    let tags = tools
        .metadata
        .read_tags(source, &REQUIRED_TAGS)
        .with_context(|| format!("error reading tags from {:?}", source))?;

    let observed = match tags.get("DATE-OBS").and_then(|v| v.as_deref()) {
        Some(raw) => match parse_observation_date(raw) {
            Some(ts) => ts,
            None => {
                warn!("DATE-OBS in {:?} ({}) is invalid, skipping!", source, raw);
                return Ok(None);
            }
        },
        None => {
            warn!("DATE-OBS missing in {:?}, skipping!", source);
            return Ok(None);
        }
    };

    let image_path = store.image_path(source, observed);
    if image_path.is_file() {
        debug!("Source {:?} already converted to {:?}, skipping!", source, image_path);
        return Ok(None);
    }

    let channel = match tags
        .get("WAVELNTH")
        .and_then(|v| v.as_deref())
        .and_then(|raw| raw.trim().parse::<u32>().ok())
    {
        Some(channel) if CHANNELS.contains(&channel) => channel,
        Some(channel) => {
            warn!("Unknown wavelength {} for {:?}, skipping!", channel, source);
            return Ok(None);
        }
        None => {
            warn!("WAVELNTH missing or invalid in {:?}, skipping!", source);
            return Ok(None);
        }
    };

    let quality = match tags
        .get("QUALITY")
        .and_then(|v| v.as_deref())
        .and_then(|raw| raw.trim().parse::<u32>().ok())
    {
        Some(quality) => quality,
        None => {
            warn!("QUALITY missing or invalid in {:?}, skipping!", source);
            return Ok(None);
        }
    };

    if !quality_acceptable(quality) {
        warn!(
            "Quality of {:?} ({:#x}) does not meet the minimum required quality, skipping!",
            source, quality
        );
        state.poison.mark(source);
        return Ok(None);
    }

    let image_dir = store.image_hour_dir(observed);
    fs::create_dir_all(&image_dir)
        .with_context(|| format!("cannot create directory {:?}", image_dir))?;

    info!("Making image for {:?}", source);
    tools
        .converter
        .fits_to_png(source, &image_dir, None)
        .with_context(|| format!("error while making image from {:?}", source))?;

    Ok(Some(BuiltImage {
        channel,
        observed,
        path: image_path,
    }))
}

fn parse_observation_date(raw: &str) -> Option<DateTime<Utc>> {
    const FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
    let trimmed = raw.trim().trim_end_matches('Z');
    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .map(|naive| naive.and_utc())
}
