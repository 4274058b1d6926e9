use super::types::*;
use crate::utils::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub tools: ToolsConfig,
    pub logging: LoggingConfig,
    pub scan: ScanConfig,
    pub clips: ClipsConfig,
    pub ladder: LadderConfig,
    pub frames: FramesConfig,
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)?;
        let config: Config = serde_yaml::from_str(&config_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the given file, falling back to built-in defaults when it does
    /// not exist. A file that exists but fails to parse is still an error.
    pub fn load_with_fallback<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let path = config_path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            warn!(
                "Config file {} not found, using built-in defaults",
                path.display()
            );
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<()> {
        use crate::utils::Error;

        if self.clips.window_stride_secs == 0 {
            return Err(Error::validation("clips.window_stride_secs must be > 0"));
        }
        if self.clips.window_span_secs == 0 {
            return Err(Error::validation("clips.window_span_secs must be > 0"));
        }
        if self.clips.window_span_secs >= self.clips.window_stride_secs {
            return Err(Error::validation(
                "clips.window_span_secs must be smaller than the stride, or windows overlap",
            ));
        }
        if self.clips.clip_duration_secs == 0 {
            return Err(Error::validation("clips.clip_duration_secs must be > 0"));
        }
        if self.clips.bitrate_kbps == 0 {
            return Err(Error::validation("clips.bitrate_kbps must be > 0"));
        }
        if self.frames.per_clip == 0 {
            return Err(Error::validation("frames.per_clip must be > 0"));
        }
        if self.scan.min_fps <= 0.0 || self.scan.reference_fps <= 0.0 {
            return Err(Error::validation("scan frame rates must be positive"));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tools: ToolsConfig {
                ffmpeg: "ffmpeg".to_string(),
                ffprobe: "ffprobe".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                show_timestamps: true,
                colored_output: true,
            },
            scan: ScanConfig {
                width: 3840,
                height: 2160,
                min_fps: 50.0,
                reference_bitrate_mbps: 28.0,
                reference_fps: 60.0,
            },
            clips: ClipsConfig {
                window_offset_secs: 60,
                window_stride_secs: 130,
                window_span_secs: 120,
                clip_duration_secs: 10,
                bitrate_kbps: 50_000,
            },
            ladder: LadderConfig {
                preset: "slow".to_string(),
                pixel_format: "yuv420p10le".to_string(),
                skip_reference_row: true,
            },
            frames: FramesConfig {
                per_clip: 1,
                tail_guard: 5,
                range: "tv".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_overlapping_windows_rejected() {
        let mut config = Config::default();
        config.clips.window_span_secs = 130;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_bitrate_rejected() {
        let mut config = Config::default();
        config.clips.bitrate_kbps = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_yaml() {
        let yaml = r#"
tools:
  ffmpeg: "/opt/ffmpeg/ffmpeg"
  ffprobe: "/opt/ffmpeg/ffprobe"

logging:
  level: "debug"
  show_timestamps: false
  colored_output: true

scan:
  width: 3840
  height: 2160
  min_fps: 50.0
  reference_bitrate_mbps: 28.0
  reference_fps: 60.0

clips:
  window_offset_secs: 60
  window_stride_secs: 130
  window_span_secs: 120
  clip_duration_secs: 10
  bitrate_kbps: 50000

ladder:
  preset: "slow"
  pixel_format: "yuv420p10le"
  skip_reference_row: true

frames:
  per_clip: 2
  tail_guard: 5
  range: "tv"
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.tools.ffmpeg, "/opt/ffmpeg/ffmpeg");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.frames.per_clip, 2);
        config.validate().unwrap();
    }

    #[test]
    fn test_bits_per_pixel_floor() {
        let config = Config::default();
        let floor = config.scan.min_bits_per_pixel_per_frame();
        let expected = 28.0 / (3840.0 * 2160.0 * 60.0);
        assert!((floor - expected).abs() < 1e-15);
    }
}
