pub mod poison;
pub mod rebuild;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::propagate::BuiltImage;
use crate::store::Channel;
use poison::PoisonCache;
use rebuild::RebuildSet;

/// All mutable state shared between the scheduler loop and the workers.
///
/// Passed by `Arc`, never ambient; each member synchronizes independently so
/// no lock spans two structures.
#[derive(Debug, Default)]
pub struct SharedState {
    /// Sources rejected for quality, TTL = rolling window.
    pub poison: PoisonCache,
    /// VideoSegment tier: (channel, hour bucket) pending build.
    pub segments: RebuildSet<(Channel, DateTime<Utc>)>,
    /// DailyVideo tier: (channel, half-day anchor) pending build.
    pub daily_videos: RebuildSet<(Channel, DateTime<Utc>)>,
    /// LatestVideo tier: channels pending a wholesale rebuild.
    pub latest_videos: RebuildSet<Channel>,
    /// Newest built image per channel awaiting latest-image promotion.
    pub latest_images: LatestImageSet,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Per-channel candidate for the public latest image; only the newest
/// observation survives until the promotion task consumes the map.
#[derive(Debug, Default)]
pub struct LatestImageSet {
    candidates: DashMap<Channel, BuiltImage>,
}

impl LatestImageSet {
    pub fn offer(&self, image: BuiltImage) {
        let mut entry = self
            .candidates
            .entry(image.channel)
            .or_insert_with(|| image.clone());
        if image.observed > entry.observed {
            *entry = image;
        }
    }

    pub fn take_all(&self) -> Vec<BuiltImage> {
        let channels: Vec<Channel> = self.candidates.iter().map(|e| *e.key()).collect();
        channels
            .into_iter()
            .filter_map(|channel| self.candidates.remove(&channel).map(|(_, image)| image))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};
    use std::path::PathBuf;

    fn image(channel: Channel, hour: u32, minute: u32) -> BuiltImage {
        BuiltImage {
            channel,
            observed: Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, 0).unwrap(),
            path: PathBuf::from(format!("img-{channel}-{hour}{minute}.png")),
        }
    }

    #[test]
    fn offer_keeps_newest_per_channel() {
        let set = LatestImageSet::default();
        set.offer(image(171, 5, 30));
        set.offer(image(171, 4, 0));
        set.offer(image(171, 6, 0));
        set.offer(image(193, 1, 0));

        let mut taken = set.take_all();
        taken.sort_by_key(|i| i.channel);
        assert_eq!(taken.len(), 2);
        assert_eq!(taken[0].observed.hour(), 6);
        assert!(set.is_empty());
    }
}
