use std::io::Write;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::config::ScanConfig;
use crate::metadata::{probe_video_stream, Rational, VideoStreamProbe};
use crate::utils::{Error, FfmpegWrapper, Result};

const MANIFEST_HEADER: &str = "name,path,width,height,fps,duration_secs,bitrate_mbps,color_transfer";

/// One selected source, as written to the scan manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    pub name: String,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub duration_secs: f64,
    pub bitrate_mbps: f64,
    pub color_transfer: String,
}

impl SourceRecord {
    fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{:.3},{:.3},{:.3},{}",
            self.name,
            self.path.display(),
            self.width,
            self.height,
            self.fps,
            self.duration_secs,
            self.bitrate_mbps,
            self.color_transfer
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ManifestRow {
    pub path: PathBuf,
    pub duration_secs: f64,
    pub color_transfer: String,
}

pub fn read_manifest<P: AsRef<Path>>(path: P) -> Result<Vec<ManifestRow>> {
    let content = std::fs::read_to_string(path)?;
    let mut rows = Vec::new();

    for line in content.lines().skip(1) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() < 8 {
            return Err(Error::parse(format!(
                "Manifest row has {} fields, expected 8",
                fields.len()
            )));
        }

        rows.push(ManifestRow {
            path: PathBuf::from(fields[1]),
            duration_secs: fields[5]
                .parse()
                .map_err(|_| Error::parse(format!("Bad manifest duration '{}'", fields[5])))?,
            color_transfer: fields[7].to_string(),
        });
    }

    Ok(rows)
}

/// HDR indicators on the probed stream: PQ transfer, a BT.2020 matrix, or
/// more than 8 bits per raw sample.
pub fn is_hdr_stream(stream: &VideoStreamProbe) -> bool {
    if stream.color_transfer.as_deref() == Some("smpte2084") {
        return true;
    }
    if matches!(
        stream.color_space.as_deref(),
        Some("bt2020nc") | Some("bt2020c")
    ) {
        return true;
    }
    stream
        .bits_per_raw_sample
        .as_deref()
        .and_then(|b| b.parse::<u8>().ok())
        .is_some_and(|bits| bits > 8)
}

/// Walks the raw archive, probes every video, and writes the manifest of
/// sources worth clipping: genuinely HDR, full 4K, high frame rate, and
/// carrying enough bits per pixel per frame to count as pristine.
pub struct SourceScanner {
    ffmpeg: FfmpegWrapper,
    config: ScanConfig,
}

impl SourceScanner {
    pub fn new(ffmpeg: FfmpegWrapper, config: ScanConfig) -> Self {
        Self { ffmpeg, config }
    }

    pub async fn scan(&self, input_dir: &Path, manifest_path: &Path) -> Result<usize> {
        let files = crate::utils::find_video_files(input_dir)?;
        info!("Scanning {} video file(s) under {}", files.len(), input_dir.display());

        let bar = ProgressBar::new(files.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let mut selected = Vec::new();

        for file in &files {
            bar.set_message(
                file.file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default(),
            );

            match self.inspect(file).await {
                Ok(Some(record)) => selected.push(record),
                Ok(None) => {}
                Err(e) => {
                    warn!("Skipping {}: {}", file.display(), e);
                }
            }
            bar.inc(1);
        }

        bar.finish_and_clear();

        let mut out = std::io::BufWriter::new(std::fs::File::create(manifest_path)?);
        writeln!(out, "{}", MANIFEST_HEADER)?;
        for record in &selected {
            writeln!(out, "{}", record.to_csv_row())?;
        }
        out.flush()?;

        info!(
            "Selected {}/{} source(s) -> {}",
            selected.len(),
            files.len(),
            manifest_path.display()
        );
        Ok(selected.len())
    }

    async fn inspect(&self, path: &Path) -> Result<Option<SourceRecord>> {
        let stream = probe_video_stream(&self.ffmpeg, path).await?;

        if !is_hdr_stream(&stream) {
            debug!("{} is not HDR", path.display());
            return Ok(None);
        }

        let record = self.build_record(path, &stream).await?;
        if !self.passes_filters(&record) {
            debug!(
                "{} filtered out ({}x{} @ {:.2}fps, {:.2}Mbps)",
                path.display(),
                record.width,
                record.height,
                record.fps,
                record.bitrate_mbps
            );
            return Ok(None);
        }

        Ok(Some(record))
    }

    async fn build_record(&self, path: &Path, stream: &VideoStreamProbe) -> Result<SourceRecord> {
        let width = stream
            .width
            .ok_or_else(|| Error::probe("Stream has no width"))?;
        let height = stream
            .height
            .ok_or_else(|| Error::probe("Stream has no height"))?;

        let fps = stream
            .avg_frame_rate
            .as_deref()
            .or(stream.r_frame_rate.as_deref())
            .and_then(Rational::parse)
            .map(|r| r.as_f64())
            .ok_or_else(|| Error::probe("Stream has no usable frame rate"))?;

        let duration_secs = match stream.duration.as_deref().and_then(|d| d.parse::<f64>().ok()) {
            Some(duration) => duration,
            None => self.ffmpeg.get_duration(path).await?,
        };
        if duration_secs <= 0.0 {
            return Err(Error::probe("Stream has no usable duration"));
        }

        // container bitrate when reported, size/duration otherwise
        let bitrate_mbps = match stream.bit_rate.as_deref().and_then(|b| b.parse::<f64>().ok()) {
            Some(bps) => bps / 1e6,
            None => {
                let size_bytes = std::fs::metadata(path)?.len();
                (size_bytes as f64 * 8.0) / (duration_secs * 1e6)
            }
        };

        Ok(SourceRecord {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            path: path.to_path_buf(),
            width,
            height,
            fps,
            duration_secs,
            bitrate_mbps,
            color_transfer: stream
                .color_transfer
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
        })
    }

    fn passes_filters(&self, record: &SourceRecord) -> bool {
        if record.width != self.config.width || record.height != self.config.height {
            return false;
        }
        if record.fps < self.config.min_fps {
            return false;
        }

        let bits_per_pixel_per_frame =
            record.bitrate_mbps / (record.width as f64 * record.height as f64 * record.fps);
        bits_per_pixel_per_frame >= self.config.min_bits_per_pixel_per_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scan_config() -> ScanConfig {
        ScanConfig {
            width: 3840,
            height: 2160,
            min_fps: 50.0,
            reference_bitrate_mbps: 28.0,
            reference_fps: 60.0,
        }
    }

    fn hdr_stream() -> VideoStreamProbe {
        serde_json::from_str(
            r#"{
                "codec_name": "hevc",
                "width": 3840,
                "height": 2160,
                "pix_fmt": "yuv420p10le",
                "bits_per_raw_sample": "10",
                "color_space": "bt2020nc",
                "color_transfer": "smpte2084",
                "r_frame_rate": "50/1",
                "avg_frame_rate": "50/1",
                "duration": "600.0",
                "bit_rate": "52000000"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_hdr_detection_by_transfer() {
        let mut stream = hdr_stream();
        stream.color_space = None;
        stream.bits_per_raw_sample = None;
        assert!(is_hdr_stream(&stream));
    }

    #[test]
    fn test_hdr_detection_by_color_space() {
        let mut stream = hdr_stream();
        stream.color_transfer = Some("bt709".to_string());
        stream.bits_per_raw_sample = None;
        assert!(is_hdr_stream(&stream));
    }

    #[test]
    fn test_hdr_detection_by_bit_depth() {
        let mut stream = hdr_stream();
        stream.color_transfer = Some("bt709".to_string());
        stream.color_space = Some("bt709".to_string());
        assert!(is_hdr_stream(&stream));
        stream.bits_per_raw_sample = Some("8".to_string());
        assert!(!is_hdr_stream(&stream));
    }

    #[test]
    fn test_filters_accept_pristine_4k50() {
        let scanner = SourceScanner::new(
            FfmpegWrapper::new("ffmpeg".to_string(), "ffprobe".to_string()),
            scan_config(),
        );
        let record = SourceRecord {
            name: "a.mp4".to_string(),
            path: PathBuf::from("/v/a.mp4"),
            width: 3840,
            height: 2160,
            fps: 50.0,
            duration_secs: 600.0,
            bitrate_mbps: 52.0,
            color_transfer: "smpte2084".to_string(),
        };
        assert!(scanner.passes_filters(&record));

        let mut low_rate = record.clone();
        // 28 Mbps at 60 fps is the floor per pixel; 10 Mbps at 50 fps is under it
        low_rate.bitrate_mbps = 10.0;
        assert!(!scanner.passes_filters(&low_rate));

        let mut not_4k = record.clone();
        not_4k.width = 1920;
        not_4k.height = 1080;
        assert!(!scanner.passes_filters(&not_4k));

        let mut slow = record;
        slow.fps = 25.0;
        assert!(!scanner.passes_filters(&slow));
    }

    #[test]
    fn test_manifest_roundtrip() {
        let record = SourceRecord {
            name: "a_600.mp4".to_string(),
            path: PathBuf::from("/videos/a_600.mp4"),
            width: 3840,
            height: 2160,
            fps: 50.0,
            duration_secs: 600.0,
            bitrate_mbps: 52.5,
            color_transfer: "arib-std-b67".to_string(),
        };

        let content = format!("{}\n{}\n", MANIFEST_HEADER, record.to_csv_row());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.csv");
        std::fs::write(&path, content).unwrap();

        let rows = read_manifest(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].path, PathBuf::from("/videos/a_600.mp4"));
        assert_eq!(rows[0].duration_secs, 600.0);
        assert_eq!(rows[0].color_transfer, "arib-std-b67");
    }

    #[test]
    fn test_manifest_rejects_short_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.csv");
        std::fs::write(&path, format!("{}\na,b,c\n", MANIFEST_HEADER)).unwrap();
        assert!(read_manifest(&path).is_err());
    }
}
