use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::{LATEST_WINDOW_HOURS, LATEST_WINDOW_HOURS_4500};

/// Daemon configuration, deserialized from `HELIOVIEW_`-prefixed environment
/// variables (a `.env` file is honored). Every field has a default so the
/// daemon starts on a bare environment.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Root of the incoming quicklook FITS tree.
    #[serde(default = "default_fits_root")]
    pub fits_root: PathBuf,
    /// Root of the generated image tree.
    #[serde(default = "default_images_root")]
    pub images_root: PathBuf,
    /// Root of the generated video segment tree.
    #[serde(default = "default_segments_root")]
    pub segments_root: PathBuf,
    /// Root of the generated daily/latest video tree.
    #[serde(default = "default_videos_root")]
    pub videos_root: PathBuf,
    /// Duration in hours to go back in time for the creation of images and videos.
    #[serde(default = "default_window_hours")]
    pub window_hours: i64,
    /// Max number of concurrently running external conversion tools.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Frame rate for generated videos.
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
    #[serde(default = "default_ffmpeg_bin")]
    pub ffmpeg_bin: PathBuf,
    #[serde(default = "default_fits2png_bin")]
    pub fits2png_bin: PathBuf,
    #[serde(default = "default_convert_bin")]
    pub convert_bin: PathBuf,
}

fn default_fits_root() -> PathBuf {
    PathBuf::from("/data/SDO/public/AIA_quicklook")
}

fn default_images_root() -> PathBuf {
    PathBuf::from("/data/SDO/public/latest/images")
}

fn default_segments_root() -> PathBuf {
    PathBuf::from("/data/SDO/public/latest/videos_pieces")
}

fn default_videos_root() -> PathBuf {
    PathBuf::from("/data/SDO/public/latest/videos")
}

fn default_window_hours() -> i64 {
    3 * 24
}

fn default_max_concurrency() -> usize {
    5
}

fn default_frame_rate() -> u32 {
    16
}

fn default_ffmpeg_bin() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_fits2png_bin() -> PathBuf {
    PathBuf::from("fits2png.x")
}

fn default_convert_bin() -> PathBuf {
    PathBuf::from("convert")
}

impl Config {
    pub fn from_env() -> Result<Self> {
        envy::prefixed("HELIOVIEW_")
            .from_env::<Config>()
            .context("failed to read configuration from environment")
    }

    /// Hours covered by the latest video of `channel`.
    pub fn latest_window_hours(&self, channel: u32) -> i64 {
        if channel == 4500 {
            LATEST_WINDOW_HOURS_4500
        } else {
            LATEST_WINDOW_HOURS
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            fits_root: default_fits_root(),
            images_root: default_images_root(),
            segments_root: default_segments_root(),
            videos_root: default_videos_root(),
            window_hours: default_window_hours(),
            max_concurrency: default_max_concurrency(),
            frame_rate: default_frame_rate(),
            ffmpeg_bin: default_ffmpeg_bin(),
            fits2png_bin: default_fits2png_bin(),
            convert_bin: default_convert_bin(),
        }
    }
}
