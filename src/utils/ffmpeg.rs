use std::path::Path;
use std::process::Stdio;
use tokio::process::Command as TokioCommand;
use regex::Regex;
use once_cell::sync::Lazy;
use tracing::debug;
use crate::utils::{Result, Error};

static DURATION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Duration: (\d{2}):(\d{2}):(\d{2})\.(\d{2})").unwrap()
});

#[derive(Debug, Clone)]
pub struct FfmpegWrapper {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl FfmpegWrapper {
    pub fn new(ffmpeg_path: String, ffprobe_path: String) -> Self {
        Self {
            ffmpeg_path,
            ffprobe_path,
        }
    }

    pub fn get_ffmpeg_path(&self) -> &str {
        &self.ffmpeg_path
    }

    pub async fn check_availability(&self) -> Result<()> {
        let ffmpeg_check = TokioCommand::new(&self.ffmpeg_path)
            .arg("-version")
            .output()
            .await?;

        if !ffmpeg_check.status.success() {
            return Err(Error::probe("FFmpeg is not available or not executable"));
        }

        let ffprobe_check = TokioCommand::new(&self.ffprobe_path)
            .arg("-version")
            .output()
            .await?;

        if !ffprobe_check.status.success() {
            return Err(Error::probe("FFprobe is not available or not executable"));
        }

        Ok(())
    }

    /// Run ffprobe with custom arguments and return stdout as string
    pub async fn run_ffprobe(&self, args: &[&str]) -> Result<String> {
        debug!("Running ffprobe with args: {:?}", args);

        let output = TokioCommand::new(&self.ffprobe_path)
            .args(args)
            .output()
            .await?;

        if !output.status.success() {
            let error_msg = String::from_utf8_lossy(&output.stderr);
            return Err(Error::probe(format!("ffprobe failed: {}", error_msg)));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Run a fully assembled ffmpeg invocation to completion. All declared
    /// outputs of the argument list are produced by this one process.
    pub async fn run_encode(&self, args: &[String]) -> Result<()> {
        let mut cmd_args = vec!["-y".to_string(), "-hide_banner".to_string()];
        cmd_args.extend_from_slice(args);

        debug!("Running ffmpeg with args: {:?}", cmd_args);

        let output = TokioCommand::new(&self.ffmpeg_path)
            .args(&cmd_args)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: String = stderr
                .lines()
                .rev()
                .take(8)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect::<Vec<_>>()
                .join("\n");
            return Err(Error::encoding(format!(
                "ffmpeg exited with {}: {}",
                output.status, tail
            )));
        }

        Ok(())
    }

    /// Spawn ffmpeg decoding the input to raw planar frames on stdout.
    /// The caller owns the child and frame-splits the byte stream itself;
    /// there are no length markers in the pipe.
    pub fn spawn_raw_decode<P: AsRef<Path>>(
        &self,
        input_path: P,
        pix_fmt: &str,
    ) -> Result<std::process::Child> {
        let input_path = input_path.as_ref().to_string_lossy();

        debug!("Spawning raw decode of {} as {}", input_path, pix_fmt);

        let child = std::process::Command::new(&self.ffmpeg_path)
            .args([
                "-nostdin",
                "-v", "error",
                "-i", &input_path,
                "-f", "rawvideo",
                "-pix_fmt", pix_fmt,
                "pipe:1",
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        Ok(child)
    }

    /// Duration via ffprobe, with a regex fallback over the text output for
    /// containers that do not report it as a format field.
    pub async fn get_duration<P: AsRef<Path>>(&self, input_path: P) -> Result<f64> {
        let input_path = input_path.as_ref().to_string_lossy();

        let output = self
            .run_ffprobe(&[
                "-v", "error",
                "-show_entries", "format=duration",
                "-of", "default=noprint_wrappers=1",
                &input_path,
            ])
            .await?;

        if let Some(line) = output.lines().find(|line| line.starts_with("duration=")) {
            if let Some(value) = line.strip_prefix("duration=") {
                if let Ok(duration) = value.trim().parse::<f64>() {
                    return Ok(duration);
                }
            }
        }

        if let Some(captures) = DURATION_REGEX.captures(&output) {
            let hours: f64 = captures[1].parse().unwrap_or(0.0);
            let minutes: f64 = captures[2].parse().unwrap_or(0.0);
            let seconds: f64 = captures[3].parse().unwrap_or(0.0);
            let centiseconds: f64 = captures[4].parse().unwrap_or(0.0);
            return Ok(hours * 3600.0 + minutes * 60.0 + seconds + centiseconds / 100.0);
        }

        Err(Error::parse(format!(
            "Could not extract duration for {}",
            input_path
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_regex() {
        let caps = DURATION_REGEX
            .captures("  Duration: 01:02:03.45, start: 0.0")
            .unwrap();
        assert_eq!(&caps[1], "01");
        assert_eq!(&caps[2], "02");
        assert_eq!(&caps[3], "03");
        assert_eq!(&caps[4], "45");
    }
}
