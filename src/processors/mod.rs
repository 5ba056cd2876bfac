//! External collaborators: metadata access, pixel conversion, video encoding.
//!
//! The orchestration core only consumes these trait seams; the impls here
//! wrap the production command-line tools.

pub mod command;
pub mod image;
pub mod metadata;
pub mod video;

use std::sync::Arc;

use crate::common::config::Config;
use image::{Fits2Png, ImageConverter, ImageResizer, Magick};
use metadata::{FitsHeaderReader, MetadataReader};
use video::{Ffmpeg, VideoEncoder};

#[derive(Clone)]
pub struct Toolset {
    pub metadata: Arc<dyn MetadataReader>,
    pub converter: Arc<dyn ImageConverter>,
    pub resizer: Arc<dyn ImageResizer>,
    pub encoder: Arc<dyn VideoEncoder>,
}

impl Toolset {
    pub fn production(config: &Config) -> Self {
        Toolset {
            metadata: Arc::new(FitsHeaderReader),
            converter: Arc::new(Fits2Png::new(&config.fits2png_bin)),
            resizer: Arc::new(Magick::new(&config.convert_bin)),
            encoder: Arc::new(Ffmpeg::new(&config.ffmpeg_bin)),
        }
    }
}
