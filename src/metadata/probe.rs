use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::utils::{Error, FfmpegWrapper, Result};

/// Raw color/mastering metadata for one source, as reported by ffprobe.
/// Nothing here is validated or defaulted; that is the normalizer's job.
#[derive(Debug, Clone, Default)]
pub struct ProbeResult {
    pub frame_rate: Option<String>,
    pub color_space: Option<String>,
    pub color_primaries: Option<String>,
    pub color_transfer: Option<String>,
    pub pix_fmt: Option<String>,
    /// Last mastering side-data block of the first frame, if any.
    pub side_data: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct FrameProbeOutput {
    #[serde(default)]
    frames: Vec<FrameInfo>,
}

#[derive(Debug, Deserialize)]
struct FrameInfo {
    color_space: Option<String>,
    color_primaries: Option<String>,
    color_transfer: Option<String>,
    pix_fmt: Option<String>,
    #[serde(default)]
    side_data_list: Vec<HashMap<String, serde_json::Value>>,
}

/// Stream-level facts used by source selection and frame extraction.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoStreamProbe {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub pix_fmt: Option<String>,
    pub codec_name: Option<String>,
    pub bits_per_raw_sample: Option<String>,
    pub color_space: Option<String>,
    pub color_transfer: Option<String>,
    pub color_primaries: Option<String>,
    pub color_range: Option<String>,
    pub r_frame_rate: Option<String>,
    pub avg_frame_rate: Option<String>,
    pub duration: Option<String>,
    pub bit_rate: Option<String>,
    pub nb_frames: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamProbeOutput {
    #[serde(default)]
    streams: Vec<VideoStreamProbe>,
}

/// Probe the color and mastering metadata needed to build encode commands.
/// The frame rate comes from the stream header; color signaling and the
/// mastering side data come from the first decoded frame, which is enough
/// for HDR10 content where the block is static.
pub async fn probe_color_metadata<P: AsRef<Path>>(
    ffmpeg: &FfmpegWrapper,
    input_path: P,
) -> Result<ProbeResult> {
    let input_path = input_path.as_ref().to_string_lossy();

    let fps_out = ffmpeg
        .run_ffprobe(&[
            "-v", "error",
            "-select_streams", "v",
            "-of", "default=noprint_wrappers=1:nokey=1",
            "-show_entries", "stream=r_frame_rate",
            &input_path,
        ])
        .await?;
    let frame_rate = fps_out
        .lines()
        .next()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty());

    let frames_out = ffmpeg
        .run_ffprobe(&[
            "-hide_banner",
            "-loglevel", "warning",
            "-select_streams", "v",
            "-print_format", "json",
            "-read_intervals", "%+#1",
            "-show_frames",
            "-show_entries",
            "frame=color_space,color_primaries,color_transfer,side_data_list,pix_fmt",
            &input_path,
        ])
        .await?;

    let parsed: FrameProbeOutput = serde_json::from_str(&frames_out)?;
    let frame = parsed
        .frames
        .into_iter()
        .next()
        .ok_or_else(|| Error::probe(format!("No video frames reported for {}", input_path)))?;

    debug!(
        "Probed {}: transfer={:?} pix_fmt={:?} side_data_blocks={}",
        input_path,
        frame.color_transfer,
        frame.pix_fmt,
        frame.side_data_list.len()
    );

    Ok(ProbeResult {
        frame_rate,
        color_space: frame.color_space,
        color_primaries: frame.color_primaries,
        color_transfer: frame.color_transfer,
        pix_fmt: frame.pix_fmt,
        side_data: frame.side_data_list.into_iter().last(),
    })
}

/// Probe the first video stream of a file.
pub async fn probe_video_stream<P: AsRef<Path>>(
    ffmpeg: &FfmpegWrapper,
    input_path: P,
) -> Result<VideoStreamProbe> {
    let input_path = input_path.as_ref().to_string_lossy();

    let out = ffmpeg
        .run_ffprobe(&[
            "-v", "error",
            "-select_streams", "v:0",
            "-show_streams",
            "-print_format", "json",
            &input_path,
        ])
        .await?;

    let parsed: StreamProbeOutput = serde_json::from_str(&out)?;
    parsed
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| Error::probe(format!("No video stream found in {}", input_path)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_probe_deserialization() {
        let json = r#"{
            "frames": [{
                "pix_fmt": "yuv420p10le",
                "color_space": "bt2020nc",
                "color_primaries": "bt2020",
                "color_transfer": "smpte2084",
                "side_data_list": [
                    {"side_data_type": "Content light level metadata"},
                    {
                        "side_data_type": "Mastering display metadata",
                        "green_x": "13248/50000",
                        "max_luminance": "10000000/10000"
                    }
                ]
            }]
        }"#;

        let parsed: FrameProbeOutput = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.frames.len(), 1);
        let frame = &parsed.frames[0];
        assert_eq!(frame.color_transfer.as_deref(), Some("smpte2084"));
        assert_eq!(frame.side_data_list.len(), 2);

        let last = frame.side_data_list.last().unwrap();
        assert_eq!(
            last.get("green_x").and_then(|v| v.as_str()),
            Some("13248/50000")
        );
    }

    #[test]
    fn test_stream_probe_deserialization() {
        let json = r#"{
            "streams": [{
                "codec_name": "hevc",
                "width": 3840,
                "height": 2160,
                "pix_fmt": "yuv420p10le",
                "bits_per_raw_sample": "10",
                "color_transfer": "smpte2084",
                "r_frame_rate": "50/1",
                "avg_frame_rate": "50/1",
                "duration": "600.000000",
                "bit_rate": "52000000"
            }]
        }"#;

        let parsed: StreamProbeOutput = serde_json::from_str(json).unwrap();
        let stream = &parsed.streams[0];
        assert_eq!(stream.width, Some(3840));
        assert_eq!(stream.bits_per_raw_sample.as_deref(), Some("10"));
        assert_eq!(stream.duration.as_deref(), Some("600.000000"));
    }
}
