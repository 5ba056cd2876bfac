//! Deterministic artifact layout.
//!
//! Every artifact path is a pure function of (tier, channel, bucket); whether
//! the file exists on disk is the only staleness signal the pipeline uses.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Timelike, Utc};

use crate::common::config::Config;

pub type Channel = u32;

/// One stage of derived artifact in the dependency chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Image,
    VideoSegment,
    DailyVideo,
    LatestVideo,
}

/// Variants of the promoted latest image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatestImageKind {
    Large,
    Medium,
    Small,
    Button,
}

impl LatestImageKind {
    pub fn suffix(self) -> &'static str {
        match self {
            LatestImageKind::Large => "large.png",
            LatestImageKind::Medium => "medium.png",
            LatestImageKind::Small => "small.png",
            LatestImageKind::Button => "button.png",
        }
    }
}

/// Truncate a timestamp to the start of its hour (the Image/VideoSegment bucket).
pub fn hour_bucket(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .expect("minute/second/nanosecond zero is always in range")
}

/// The half-day anchor (00:00 or 12:00) containing `hour`.
/// An hour exactly on an anchor belongs to the bucket it starts.
pub fn half_day_anchor(hour: DateTime<Utc>) -> DateTime<Utc> {
    let hour = hour_bucket(hour);
    let anchor_hour = if hour.hour() < 12 { 0 } else { 12 };
    hour.with_hour(anchor_hour)
        .expect("hour 0 and 12 are always in range")
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    fits_root: PathBuf,
    images_root: PathBuf,
    segments_root: PathBuf,
    videos_root: PathBuf,
}

impl ArtifactStore {
    pub fn new(config: &Config) -> Self {
        ArtifactStore {
            fits_root: config.fits_root.clone(),
            images_root: config.images_root.clone(),
            segments_root: config.segments_root.clone(),
            videos_root: config.videos_root.clone(),
        }
    }

    fn hour_dir(root: &Path, hour: DateTime<Utc>) -> PathBuf {
        root.join(hour.format("%Y/%m/%d").to_string())
            .join(format!("H{}00", hour.format("%H")))
    }

    /// Source directory for one (channel, hour); externally populated, read-only.
    pub fn fits_hour_dir(&self, channel: Channel, hour: DateTime<Utc>) -> PathBuf {
        Self::hour_dir(&self.fits_root.join(format!("{:04}", channel)), hour)
    }

    /// Directory holding the converted images of one hour (all channels).
    pub fn image_hour_dir(&self, hour: DateTime<Utc>) -> PathBuf {
        Self::hour_dir(&self.images_root, hour)
    }

    /// Image artifact path for a given source file stem.
    pub fn image_path(&self, source: &Path, observed: DateTime<Utc>) -> PathBuf {
        let stem = source.file_stem().unwrap_or_default();
        let mut name = stem.to_os_string();
        name.push(".png");
        self.image_hour_dir(observed).join(name)
    }

    pub fn segment_path(&self, channel: Channel, hour: DateTime<Utc>) -> PathBuf {
        Self::hour_dir(&self.segments_root, hour).join(format!(
            "AIA.{}_{}0000.{:04}.quicklook.ts",
            hour.format("%Y%m%d"),
            hour.format("%H"),
            channel
        ))
    }

    pub fn daily_video_path(&self, channel: Channel, anchor: DateTime<Utc>) -> PathBuf {
        self.videos_root
            .join(anchor.format("%Y/%m/%d").to_string())
            .join(format!(
                "AIA.{}_{}0000.{:04}.quicklook.mp4",
                anchor.format("%Y%m%d"),
                anchor.format("%H"),
                channel
            ))
    }

    pub fn latest_video_path(&self, channel: Channel) -> PathBuf {
        self.videos_root
            .join("latest")
            .join(format!("AIA.latest.{:04}.quicklook.mp4", channel))
    }

    pub fn latest_image_path(&self, channel: Channel, kind: LatestImageKind) -> PathBuf {
        self.images_root.join("latest").join(format!(
            "AIA.latest.{:04}.quicklook.{}",
            channel,
            kind.suffix()
        ))
    }

    pub fn segment_exists(&self, channel: Channel, hour: DateTime<Utc>) -> bool {
        self.segment_path(channel, hour).is_file()
    }

    pub fn daily_video_exists(&self, channel: Channel, anchor: DateTime<Utc>) -> bool {
        self.daily_video_path(channel, anchor).is_file()
    }

    pub fn latest_video_exists(&self, channel: Channel) -> bool {
        self.latest_video_path(channel).is_file()
    }

    /// Sibling temp path used while rebuilding an artifact served from a
    /// fixed public location.
    pub fn temp_sibling(path: &Path) -> PathBuf {
        let mut name = path.file_stem().unwrap_or_default().to_os_string();
        name.push(".tmp");
        if let Some(ext) = path.extension() {
            name.push(".");
            name.push(ext);
        }
        path.with_file_name(name)
    }

    /// Atomically replace `public` with the fully written `temp` file, so a
    /// concurrent reader observes either the old or the new artifact.
    pub fn promote(temp: &Path, public: &Path) -> Result<()> {
        if let Some(parent) = public.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory tree for {:?}", parent))?;
        }
        fs::rename(temp, public)
            .with_context(|| format!("failed to move {:?} to {:?}", temp, public))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn store() -> ArtifactStore {
        let mut config = Config::default();
        config.fits_root = PathBuf::from("/fits");
        config.images_root = PathBuf::from("/images");
        config.segments_root = PathBuf::from("/segments");
        config.videos_root = PathBuf::from("/videos");
        ArtifactStore::new(&config)
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn hour_bucket_truncates() {
        assert_eq!(hour_bucket(at(2024, 1, 1, 5, 37)), at(2024, 1, 1, 5, 0));
        assert_eq!(hour_bucket(at(2024, 1, 1, 5, 0)), at(2024, 1, 1, 5, 0));
    }

    #[test]
    fn half_day_anchor_splits_at_noon() {
        assert_eq!(half_day_anchor(at(2024, 1, 1, 5, 0)), at(2024, 1, 1, 0, 0));
        assert_eq!(half_day_anchor(at(2024, 1, 1, 11, 0)), at(2024, 1, 1, 0, 0));
        assert_eq!(half_day_anchor(at(2024, 1, 1, 12, 0)), at(2024, 1, 1, 12, 0));
        assert_eq!(half_day_anchor(at(2024, 1, 1, 23, 0)), at(2024, 1, 1, 12, 0));
    }

    #[test]
    fn boundary_hour_belongs_to_the_bucket_it_starts() {
        assert_eq!(half_day_anchor(at(2024, 1, 1, 0, 0)), at(2024, 1, 1, 0, 0));
        assert_eq!(half_day_anchor(at(2024, 1, 1, 12, 0)), at(2024, 1, 1, 12, 0));
    }

    #[test]
    fn segment_path_encodes_channel_and_bucket() {
        let path = store().segment_path(171, at(2024, 1, 1, 5, 0));
        assert_eq!(
            path,
            PathBuf::from("/segments/2024/01/01/H0500/AIA.20240101_050000.0171.quicklook.ts")
        );
    }

    #[test]
    fn daily_video_path_encodes_anchor() {
        let path = store().daily_video_path(193, at(2024, 1, 1, 12, 0));
        assert_eq!(
            path,
            PathBuf::from("/videos/2024/01/01/AIA.20240101_120000.0193.quicklook.mp4")
        );
    }

    #[test]
    fn latest_paths_are_fixed_per_channel() {
        let store = store();
        assert_eq!(
            store.latest_video_path(94),
            PathBuf::from("/videos/latest/AIA.latest.0094.quicklook.mp4")
        );
        assert_eq!(
            store.latest_image_path(94, LatestImageKind::Button),
            PathBuf::from("/images/latest/AIA.latest.0094.quicklook.button.png")
        );
    }

    #[test]
    fn image_path_keeps_source_stem() {
        let path = store().image_path(
            Path::new("/fits/0171/2024/01/01/H0500/AIA.20240101_053700.0171.quicklook.fits"),
            at(2024, 1, 1, 5, 37),
        );
        assert_eq!(
            path,
            PathBuf::from("/images/2024/01/01/H0500/AIA.20240101_053700.0171.quicklook.png")
        );
    }

    #[test]
    fn temp_sibling_stays_in_same_directory() {
        let temp = ArtifactStore::temp_sibling(Path::new("/videos/latest/a.mp4"));
        assert_eq!(temp, PathBuf::from("/videos/latest/a.tmp.mp4"));
    }
}
