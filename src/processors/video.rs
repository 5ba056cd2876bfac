//! Video encoding tools backed by ffmpeg.
//!
//! Hourly segments are lossless MPEG-TS so daily and latest videos can be
//! produced by cheap concat remuxing into a web-playable baseline MP4.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Result, anyhow};

use super::command::{run_command, run_command_with_input_files};

#[derive(Debug, Clone, Default)]
pub struct EncodeOptions {
    pub frame_rate: u32,
    pub size: Option<String>,
    pub bitrate_kbps: Option<u32>,
    pub title: Option<String>,
}

impl EncodeOptions {
    pub fn with_frame_rate(frame_rate: u32) -> Self {
        EncodeOptions {
            frame_rate,
            ..Default::default()
        }
    }
}

pub trait VideoEncoder: Send + Sync {
    /// Encode an ordered sequence of PNG frames into a `.ts` segment.
    fn frames_to_segment(&self, frames: &[PathBuf], output: &Path, options: &EncodeOptions)
    -> Result<()>;

    /// Concatenate ordered `.ts` segments into an MP4 container.
    fn concat_to_mp4(&self, inputs: &[PathBuf], output: &Path, options: &EncodeOptions)
    -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct Ffmpeg {
    binary: PathBuf,
}

impl Ffmpeg {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Ffmpeg {
            binary: binary.into(),
        }
    }

    fn silent_command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(["-v", "quiet", "-hide_banner", "-nostats"]);
        cmd
    }

    fn push_common_options(cmd: &mut Command, options: &EncodeOptions) {
        if let Some(bitrate) = options.bitrate_kbps {
            cmd.args(["-maxrate", &format!("{}k", bitrate)]);
        }
        if let Some(title) = &options.title {
            cmd.args(["-metadata", &format!("title={}", title)]);
        }
        if let Some(size) = &options.size {
            cmd.args(["-s", size]);
        }
    }
}

impl VideoEncoder for Ffmpeg {
    fn frames_to_segment(
        &self,
        frames: &[PathBuf],
        output: &Path,
        options: &EncodeOptions,
    ) -> Result<()> {
        if frames.is_empty() {
            return Err(anyhow!("no frames to encode into {:?}", output));
        }
        let mut cmd = self.silent_command();
        cmd.args(["-y", "-r", &options.frame_rate.to_string()])
            .args(["-f", "image2pipe", "-vcodec", "png", "-i", "-"])
            .args(["-an", "-vcodec", "libx264", "-preset", "slow", "-qp", "0"]);
        Self::push_common_options(&mut cmd, options);
        cmd.arg(output);
        run_command_with_input_files(&mut cmd, frames)
    }

    fn concat_to_mp4(
        &self,
        inputs: &[PathBuf],
        output: &Path,
        options: &EncodeOptions,
    ) -> Result<()> {
        let input_spec = match inputs {
            [] => return Err(anyhow!("no input segments for {:?}", output)),
            [single] => single.to_string_lossy().into_owned(),
            many => format!(
                "concat:{}",
                many.iter()
                    .map(|p| p.to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("|")
            ),
        };

        let mut cmd = self.silent_command();
        cmd.args(["-y", "-i", &input_spec])
            .args(["-an", "-vcodec", "libx264", "-preset", "slow"])
            .args(["-profile:v", "baseline", "-pix_fmt", "yuv420p"])
            .args(["-r", &options.frame_rate.to_string()]);
        Self::push_common_options(&mut cmd, options);
        cmd.arg(output);
        run_command(&mut cmd)
    }
}
