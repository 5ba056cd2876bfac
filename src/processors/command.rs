use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, anyhow};
use log::debug;

/// Run an external tool to completion; any non-zero exit is an error carrying
/// the tool's stderr.
pub fn run_command(cmd: &mut Command) -> Result<()> {
    debug!("Running {:?}", cmd);
    let output = cmd
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("failed to spawn {:?}", cmd.get_program()))?;

    if output.status.success() {
        Ok(())
    } else {
        Err(anyhow!(
            "{:?} exited with {}: {}",
            cmd.get_program(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ))
    }
}

/// Run an external tool that consumes the given files concatenated on stdin
/// (ffmpeg's image2pipe input).
pub fn run_command_with_input_files(cmd: &mut Command, inputs: &[impl AsRef<Path>]) -> Result<()> {
    debug!("Running {:?} with {} input files", cmd, inputs.len());
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to spawn {:?}", cmd.get_program()))?;

    {
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("child stdin not captured"))?;
        for input in inputs {
            let bytes = fs::read(input.as_ref())
                .with_context(|| format!("failed to read input file {:?}", input.as_ref()))?;
            stdin
                .write_all(&bytes)
                .with_context(|| format!("failed to pipe {:?} to {:?}", input.as_ref(), cmd.get_program()))?;
        }
        // Dropping stdin closes the pipe and lets the tool finish.
    }

    let output = child
        .wait_with_output()
        .with_context(|| format!("{:?} execution failed", cmd.get_program()))?;
    if output.status.success() {
        Ok(())
    } else {
        Err(anyhow!(
            "{:?} exited with {}: {}",
            cmd.get_program(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn failed_command_error_carries_stderr() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo bad frame >&2; exit 3"]);
        let err = run_command(&mut cmd).unwrap_err();
        assert!(format!("{err:#}").contains("bad frame"));
    }

    #[test]
    fn failed_piped_command_error_carries_stderr() {
        let mut input = tempfile::NamedTempFile::new().unwrap();
        input.write_all(b"frame data").unwrap();

        let mut cmd = Command::new("sh");
        cmd.args(["-c", "cat > /dev/null; echo corrupt input >&2; exit 1"]);
        let err = run_command_with_input_files(&mut cmd, &[input.path()]).unwrap_err();
        assert!(format!("{err:#}").contains("corrupt input"));
    }

    #[test]
    fn successful_piped_command_consumes_all_inputs() {
        let mut input = tempfile::NamedTempFile::new().unwrap();
        input.write_all(b"frame data").unwrap();

        let mut cmd = Command::new("sh");
        cmd.args(["-c", "cat > /dev/null"]);
        run_command_with_input_files(&mut cmd, &[input.path(), input.path()]).unwrap();
    }
}
