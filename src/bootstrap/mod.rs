//! Startup tasks: logger, external-tool availability check, folder
//! structure, and process signal handling.

use std::fs;
use std::io::Write;
use std::process::Command;

use anyhow::{Context, Result};
use env_logger::{Builder, Env};
use log::{error, info};
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;

use crate::common::config::Config;

pub fn initialize_logger() {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {:<5} {} {}",
                buf.timestamp_seconds(),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

/// Check that the external conversion tools are reachable. A missing tool is
/// reported loudly but is not fatal: every invocation failure is handled at
/// the item boundary anyway.
pub fn check_external_tools(config: &Config) {
    for binary in [&config.ffmpeg_bin, &config.convert_bin] {
        match Command::new(binary).arg("-version").output() {
            Ok(output) if output.status.success() => {
                let version_info = String::from_utf8_lossy(&output.stdout);
                let version = version_info
                    .lines()
                    .next()
                    .unwrap_or("unknown version")
                    .to_string();
                info!("{:?}: {}", binary, version);
            }
            Ok(_) => {
                error!(
                    "{:?} was found, but it returned an error. Please ensure it's correctly installed.",
                    binary
                );
            }
            Err(_) => {
                error!(
                    "{:?} is not installed or not available in PATH. Please install it before running the daemon.",
                    binary
                );
            }
        }
    }
    // fits2png.x has no version flag; existence is checked lazily on first use.
}

/// Create the artifact roots so the first sweep does not race directory creation.
pub fn initialize_folders(config: &Config) -> Result<()> {
    for root in [
        config.images_root.join("latest"),
        config.segments_root.clone(),
        config.videos_root.join("latest"),
    ] {
        fs::create_dir_all(&root)
            .with_context(|| format!("cannot create directory {:?}", root))?;
    }
    Ok(())
}

/// Install process signal handling: INT/TERM/QUIT cancel the token for a
/// graceful drain, HUP is ignored. Failing to install handlers is an
/// unrecoverable startup failure.
pub fn install_signal_handlers(cancel: CancellationToken) -> Result<()> {
    let mut interrupt =
        signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?;
    let mut terminate =
        signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    let mut quit = signal(SignalKind::quit()).context("failed to install SIGQUIT handler")?;
    let mut hangup = signal(SignalKind::hangup()).context("failed to install SIGHUP handler")?;

    tokio::spawn(async move {
        tokio::select! {
            _ = interrupt.recv() => info!("Received SIGINT: exiting gracefully"),
            _ = terminate.recv() => info!("Received SIGTERM: exiting gracefully"),
            _ = quit.recv() => info!("Received SIGQUIT: exiting gracefully"),
        }
        cancel.cancel();
    });

    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            info!("Received SIGHUP: ignoring");
        }
    });

    Ok(())
}
