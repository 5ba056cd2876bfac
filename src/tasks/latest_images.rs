//! Latest-image promotion: copy the newest built image per channel to its
//! fixed public path and derive the thumbnail/button variants from it.

use std::fs;
use std::time::Instant;

use anyhow::{Context, Result};
use log::{debug, info};

use crate::common::{IMAGE_LARGE_SIZE, IMAGE_MEDIUM_SIZE, IMAGE_SMALL_SIZE};
use crate::processors::Toolset;
use crate::propagate::BuiltImage;
use crate::store::{ArtifactStore, LatestImageKind};
use crate::tasks::TaskContext;

pub async fn make_latest_images(ctx: &TaskContext) {
    let start_time = Instant::now();
    let candidates = ctx.state.latest_images.take_all();
    if candidates.is_empty() {
        debug!("No latest image to make");
        return;
    }
    let count = candidates.len();

    for image in candidates {
        let store = ctx.store.clone();
        let tools = ctx.tools.clone();
        ctx.pool
            .submit(format!("latest image {:04}", image.channel), move || {
                promote_one(&store, &tools, &image)
            });
    }
    ctx.pool.run_all().await;

    let duration = format!("{:?}", start_time.elapsed());
    info!(duration = &*duration; "Promoted {} latest images.", count);
}

fn promote_one(store: &ArtifactStore, tools: &Toolset, image: &BuiltImage) -> Result<()> {
    let large = store.latest_image_path(image.channel, LatestImageKind::Large);
    let temp = ArtifactStore::temp_sibling(&large);
    if let Some(parent) = large.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("cannot create directory {:?}", parent))?;
    }

    // The public large image is replaced atomically; the derived variants are
    // regenerated from it afterwards.
    debug!("Resizing {:?} to {:?}", image.path, large);
    tools
        .resizer
        .resize(&image.path, &temp, IMAGE_LARGE_SIZE)
        .with_context(|| format!("error resizing {:?} to {:?}", image.path, temp))?;
    ArtifactStore::promote(&temp, &large)?;

    tools.resizer.resize(
        &large,
        &store.latest_image_path(image.channel, LatestImageKind::Medium),
        IMAGE_MEDIUM_SIZE,
    )?;
    tools.resizer.resize(
        &large,
        &store.latest_image_path(image.channel, LatestImageKind::Small),
        IMAGE_SMALL_SIZE,
    )?;
    tools.resizer.resize_transparent(
        &large,
        &store.latest_image_path(image.channel, LatestImageKind::Button),
        IMAGE_MEDIUM_SIZE,
    )?;

    Ok(())
}
