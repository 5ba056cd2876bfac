pub mod config;

use std::sync::LazyLock;

use tokio::runtime::{Builder, Runtime};

/// AIA quicklook channels (wavelengths in angstrom).
pub const CHANNELS: &[u32] = &[94, 131, 171, 193, 211, 304, 335, 1600, 1700, 4500];

/// Min acceptable AIA quality bits (see AIA/SDO keywords).
/// A QUALITY value is acceptable iff it sets no bit outside this mask.
pub const MIN_QUALITY_MASK: u32 = (1 << 2) + (1 << 8) + (1 << 9) + (1 << 13) + (1 << 30);

pub const IMAGE_LARGE_SIZE: &str = "1024x1024>";
pub const IMAGE_MEDIUM_SIZE: &str = "128x128>";
pub const IMAGE_SMALL_SIZE: &str = "45x45>";

/// Hours covered by a latest video.
pub const LATEST_WINDOW_HOURS: i64 = 24;

/// Channel 4500 only observes a few times per day, so its latest video
/// spans a much longer window.
pub const LATEST_WINDOW_HOURS_4500: i64 = 24 * 20;

pub static CURRENT_NUM_THREADS: LazyLock<usize> =
    LazyLock::new(|| std::thread::available_parallelism().map_or(4, |n| n.get()));

// Worker-specific Tokio runtime.
// This runtime handles the scheduler loop, signal handling and all
// conversion dispatch; external tools run on its blocking pool.
pub static WORKER_RUNTIME: LazyLock<Runtime> = LazyLock::new(|| {
    Builder::new_multi_thread()
        .worker_threads(*CURRENT_NUM_THREADS)
        .thread_name("pipeline-worker")
        .enable_all()
        .build()
        .expect("Failed to build Worker Tokio runtime")
});

/// Is a QUALITY bitmask acceptable for conversion?
pub fn quality_acceptable(quality: u32) -> bool {
    quality | MIN_QUALITY_MASK == MIN_QUALITY_MASK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_inside_mask_is_acceptable() {
        assert!(quality_acceptable(0));
        assert!(quality_acceptable(1 << 2));
        assert!(quality_acceptable((1 << 8) + (1 << 30)));
    }

    #[test]
    fn quality_outside_mask_is_rejected() {
        assert!(!quality_acceptable(1 << 0));
        assert!(!quality_acceptable((1 << 2) + (1 << 3)));
    }
}
