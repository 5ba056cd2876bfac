//! Image conversion tools: FITS → PNG and thumbnail/button derivation.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Result;

use super::command::run_command;

pub trait ImageConverter: Send + Sync {
    /// Produce a PNG in `output_dir` named after the source stem, or fail.
    fn fits_to_png(&self, source: &Path, output_dir: &Path, size: Option<&str>) -> Result<()>;
}

pub trait ImageResizer: Send + Sync {
    fn resize(&self, input: &Path, output: &Path, size: &str) -> Result<()>;

    /// Resize and make near-black pixels transparent (button rendering).
    fn resize_transparent(&self, input: &Path, output: &Path, size: &str) -> Result<()>;
}

/// The fits2png.x executable from the SPoCA software suite.
#[derive(Debug, Clone)]
pub struct Fits2Png {
    binary: PathBuf,
}

impl Fits2Png {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Fits2Png {
            binary: binary.into(),
        }
    }
}

impl ImageConverter for Fits2Png {
    fn fits_to_png(&self, source: &Path, output_dir: &Path, size: Option<&str>) -> Result<()> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg(source)
            .args(["-u", "-R", "512.5,512.5", "-L", "-c"]);
        if let Some(size) = size {
            cmd.args(["-S", size]);
        }
        cmd.arg("-O").arg(output_dir);
        run_command(&mut cmd)
    }
}

/// The convert executable from the ImageMagick software suite.
#[derive(Debug, Clone)]
pub struct Magick {
    binary: PathBuf,
}

impl Magick {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Magick {
            binary: binary.into(),
        }
    }
}

impl ImageResizer for Magick {
    fn resize(&self, input: &Path, output: &Path, size: &str) -> Result<()> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg(input).args(["-resize", size]).arg(output);
        run_command(&mut cmd)
    }

    fn resize_transparent(&self, input: &Path, output: &Path, size: &str) -> Result<()> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg(input)
            .args(["-resize", size, "-fuzz", "10%", "-transparent", "black"])
            .arg(output);
        run_command(&mut cmd)
    }
}
