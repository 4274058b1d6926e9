use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use tracing::{debug, error, info};

use crate::config::FramesConfig;
use crate::decode::npy::write_npy;
use crate::decode::{FrameStream, PixelRange};
use crate::metadata::{probe_video_stream, PixelFormat, Rational};
use crate::utils::filesystem::{ensure_dest_dir, existing_output_names};
use crate::utils::{Error, FfmpegWrapper, Result};

use super::RunSummary;

/// Uniform-random sample of `count` distinct frame indices, never touching
/// the last `tail_guard` frames (a killed encode can leave the final frames
/// truncated). Returned sorted for single-pass streaming.
pub fn sample_frame_indices<R: Rng>(
    total_frames: usize,
    count: usize,
    tail_guard: usize,
    rng: &mut R,
) -> Vec<usize> {
    if total_frames <= tail_guard {
        return Vec::new();
    }

    let upper = total_frames - tail_guard;
    let count = count.min(upper);

    let mut picked = Vec::with_capacity(count);
    while picked.len() < count {
        let idx = rng.gen_range(0..upper);
        if !picked.contains(&idx) {
            picked.push(idx);
        }
    }

    picked.sort_unstable();
    picked
}

pub fn frame_output_name(clip_stem: &str, index: usize) -> String {
    format!("{}_frame_{}.npy", clip_stem, index)
}

/// Walk the frame stream once, persisting exactly the sampled indices and
/// stopping as soon as the last one is written.
fn persist_sampled_frames<R: std::io::Read>(
    frames: FrameStream<R>,
    indices: &[usize],
    stem: &str,
    dest_dir: &Path,
) -> Result<usize> {
    let last_wanted = indices.last().copied().unwrap_or(0);
    let mut wanted = indices.iter().copied().peekable();
    let mut written = 0;

    for frame in frames {
        let frame = frame?;
        if wanted.peek() == Some(&frame.frame_index) {
            wanted.next();
            let out = dest_dir.join(frame_output_name(stem, frame.frame_index));
            write_npy(&out, &frame)?;
            written += 1;
        }
        if frame.frame_index >= last_wanted {
            break;
        }
    }

    Ok(written)
}

/// Samples decoded frames out of each clip and persists them as float RGB
/// arrays. One raw-decode subprocess per clip, consumed as a stream; only
/// the sampled frames are ever held in memory.
pub struct FrameSampler {
    ffmpeg: FfmpegWrapper,
    config: FramesConfig,
}

impl FrameSampler {
    pub fn new(ffmpeg: FfmpegWrapper, config: FramesConfig) -> Self {
        Self { ffmpeg, config }
    }

    pub async fn run(
        &self,
        clips_dir: &Path,
        dest_dir: &Path,
        count_override: Option<usize>,
    ) -> Result<RunSummary> {
        ensure_dest_dir(dest_dir)?;

        let clips = crate::utils::find_video_files(clips_dir)?;
        let existing = existing_output_names(dest_dir)?;
        let per_clip = count_override.unwrap_or(self.config.per_clip);

        let mut summary = RunSummary::default();

        let bar = ProgressBar::new(clips.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        for clip in &clips {
            let stem = clip
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            bar.set_message(stem.clone());

            let prefix = format!("{}_frame_", stem);
            if existing.iter().any(|name| name.starts_with(&prefix)) {
                debug!("{} already sampled", clip.display());
                summary.skipped += 1;
                bar.inc(1);
                continue;
            }

            match self.sample_clip(clip, &stem, dest_dir, per_clip).await {
                Ok(written) if written > 0 => summary.completed += 1,
                Ok(_) => summary.skipped += 1,
                Err(e) => {
                    error!("Frame extraction failed for {}: {}", clip.display(), e);
                    summary.failed += 1;
                }
            }
            bar.inc(1);
        }

        bar.finish_and_clear();
        Ok(summary)
    }

    async fn sample_clip(
        &self,
        clip: &Path,
        stem: &str,
        dest_dir: &Path,
        per_clip: usize,
    ) -> Result<usize> {
        let stream = probe_video_stream(&self.ffmpeg, clip).await?;

        let width = stream
            .width
            .ok_or_else(|| Error::probe("Clip has no width"))? as usize;
        let height = stream
            .height
            .ok_or_else(|| Error::probe("Clip has no height"))? as usize;
        let format = PixelFormat::from_probe(stream.pix_fmt.as_deref());

        let total_frames = self.estimate_frame_count(clip, &stream).await?;
        let indices = {
            let mut rng = rand::thread_rng();
            sample_frame_indices(total_frames, per_clip, self.config.tail_guard, &mut rng)
        };
        if indices.is_empty() {
            debug!("{} has too few frames to sample", clip.display());
            return Ok(0);
        }

        let range = match self.config.range.as_str() {
            "full" => PixelRange::Full,
            _ => PixelRange::Limited,
        };

        let mut child = self.ffmpeg.spawn_raw_decode(clip, format.as_str())?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::decode("Decoder stdout not captured"))?;

        let frames = FrameStream::new(stdout, width, height, format, range, stem)?;
        let result = persist_sampled_frames(frames, &indices, stem, dest_dir);

        // the stream is abandoned once every sampled index is written (or
        // the decode failed); either way the decoder must not outlive us
        let _ = child.kill();
        let _ = child.wait();

        let written = result?;
        info!("Sampled {} frame(s) from {}", written, clip.display());
        Ok(written)
    }

    async fn estimate_frame_count(
        &self,
        clip: &Path,
        stream: &crate::metadata::VideoStreamProbe,
    ) -> Result<usize> {
        if let Some(n) = stream.nb_frames.as_deref().and_then(|n| n.parse::<usize>().ok()) {
            return Ok(n);
        }

        let fps = stream
            .avg_frame_rate
            .as_deref()
            .or(stream.r_frame_rate.as_deref())
            .and_then(Rational::parse)
            .map(|r| r.as_f64())
            .ok_or_else(|| Error::probe("Clip has no usable frame rate"))?;

        let duration = match stream.duration.as_deref().and_then(|d| d.parse::<f64>().ok()) {
            Some(duration) => duration,
            None => self.ffmpeg.get_duration(clip).await?,
        };

        Ok((duration * fps).floor() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sample_indices_avoid_tail() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let indices = sample_frame_indices(500, 3, 5, &mut rng);
            assert_eq!(indices.len(), 3);
            for idx in &indices {
                assert!(*idx < 495);
            }
        }
    }

    #[test]
    fn test_sample_indices_sorted_and_distinct() {
        let mut rng = StdRng::seed_from_u64(3);
        let indices = sample_frame_indices(100, 10, 5, &mut rng);
        assert_eq!(indices.len(), 10);
        for pair in indices.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_sample_indices_short_sequences() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(sample_frame_indices(5, 1, 5, &mut rng).is_empty());
        assert!(sample_frame_indices(0, 1, 5, &mut rng).is_empty());
        // more requested than available: capped, not an error
        let indices = sample_frame_indices(8, 100, 5, &mut rng);
        assert_eq!(indices.len(), 3);
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_frame_output_name() {
        assert_eq!(
            frame_output_name("ocean_480_73", 121),
            "ocean_480_73_frame_121.npy"
        );
    }

    #[test]
    fn test_persist_sampled_frames_writes_only_picked_indices() {
        use crate::decode::{FrameStream, PixelRange};
        use crate::metadata::PixelFormat;
        use std::io::Cursor;

        // five 4x4 mid-gray 10-bit frames
        let mut bytes = Vec::new();
        for _ in 0..5 {
            for _ in 0..(16 + 2 * 4) {
                bytes.extend_from_slice(&512u16.to_le_bytes());
            }
        }

        let frames = FrameStream::new(
            Cursor::new(bytes),
            4,
            4,
            PixelFormat::Yuv420p10Le,
            PixelRange::Limited,
            "clip_60",
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let written = persist_sampled_frames(frames, &[1, 3], "clip_60", dir.path()).unwrap();

        assert_eq!(written, 2);
        assert!(dir.path().join("clip_60_frame_1.npy").exists());
        assert!(dir.path().join("clip_60_frame_3.npy").exists());
        assert!(!dir.path().join("clip_60_frame_0.npy").exists());
        assert!(!dir.path().join("clip_60_frame_4.npy").exists());
    }
}
