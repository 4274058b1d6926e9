use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolsConfig {
    pub ffmpeg: String,
    pub ffprobe: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub show_timestamps: bool,
    pub colored_output: bool,
}

/// Source selection thresholds. The bits-per-pixel-per-frame floor is the
/// reference stream's rate spread over its pixel budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    pub width: u32,
    pub height: u32,
    pub min_fps: f64,
    pub reference_bitrate_mbps: f64,
    pub reference_fps: f64,
}

impl ScanConfig {
    pub fn min_bits_per_pixel_per_frame(&self) -> f64 {
        self.reference_bitrate_mbps
            / (self.width as f64 * self.height as f64 * self.reference_fps)
    }
}

/// Scene clip scheduling: non-overlapping windows at a fixed stride, one
/// jittered clip start per window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipsConfig {
    pub window_offset_secs: u64,
    pub window_stride_secs: u64,
    pub window_span_secs: u64,
    pub clip_duration_secs: u64,
    pub bitrate_kbps: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LadderConfig {
    pub preset: String,
    pub pixel_format: String,
    /// The first data row of the ladder table is the reference conversion
    /// and is skipped when the sources are already at reference rate.
    pub skip_reference_row: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FramesConfig {
    pub per_clip: usize,
    /// Frames held back at the end of each clip, guarding against a
    /// truncated tail frame.
    pub tail_guard: usize,
    /// "tv" (limited) or "full"
    pub range: String,
}
