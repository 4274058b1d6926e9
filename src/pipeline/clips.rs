use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use tracing::{error, info, warn};

use crate::config::ClipsConfig;
use crate::encoding::{CommandAssembler, EncodeJob, EncodeTarget, EncoderSettings};
use crate::metadata::{probe_color_metadata, MetadataNormalizer};
use crate::utils::filesystem::{ensure_dest_dir, existing_output_names, prune_partial_outputs};
use crate::utils::{Error, FfmpegWrapper, Result};

use super::RunSummary;

/// One source scheduled for clipping. The duration may come from the scan
/// manifest; when absent it is probed on demand.
#[derive(Debug, Clone)]
pub struct ClipSource {
    pub path: PathBuf,
    pub duration_secs: Option<f64>,
}

/// Window starts for one source: from the offset, one window per stride,
/// as long as a full window plus a trailing clip still fits. Deterministic
/// in the duration; the per-window jitter is applied separately.
pub fn schedule_window_starts(duration_secs: u64, config: &ClipsConfig) -> Vec<u64> {
    let mut starts = Vec::new();

    if duration_secs <= config.window_offset_secs + config.window_stride_secs {
        return starts;
    }

    let limit = duration_secs - config.window_stride_secs;
    let mut start = config.window_offset_secs;
    while start < limit {
        starts.push(start);
        start += config.window_stride_secs;
    }

    starts
}

/// One uniformly jittered clip start inside each window, bounded by the
/// window span.
pub fn jittered_clip_starts<R: Rng>(
    window_starts: &[u64],
    config: &ClipsConfig,
    rng: &mut R,
) -> Vec<u64> {
    window_starts
        .iter()
        .map(|&start| rng.gen_range(start..start + config.window_span_secs))
        .collect()
}

/// All clips of a source are written by one invocation, so any existing
/// `{stem}_*.mp4` output means the source is already clipped. Clip starts
/// are randomized and cannot be re-derived at skip time.
pub fn is_already_clipped(source: &Path, existing: &[String]) -> bool {
    let stem = match source.file_stem().and_then(|s| s.to_str()) {
        Some(stem) => stem,
        None => return false,
    };
    let prefix = format!("{}_", stem);

    existing
        .iter()
        .any(|name| name.starts_with(&prefix) && name.ends_with(".mp4"))
}

/// Cuts each source into jittered 10-second scene clips, converting HLG
/// sources to PQ on the way, all sub-clips in a single decode pass.
pub struct ClipRunner {
    ffmpeg: FfmpegWrapper,
    config: ClipsConfig,
    assembler: CommandAssembler,
}

impl ClipRunner {
    pub fn new(ffmpeg: FfmpegWrapper, config: ClipsConfig) -> Self {
        Self {
            ffmpeg,
            config,
            assembler: CommandAssembler::new(EncoderSettings::default()),
        }
    }

    pub async fn run(&self, sources: Vec<ClipSource>, dest_dir: &Path) -> Result<RunSummary> {
        ensure_dest_dir(dest_dir)?;
        prune_partial_outputs(dest_dir)?;

        let existing = existing_output_names(dest_dir)?;
        let mut summary = RunSummary::default();

        let bar = ProgressBar::new(sources.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        for source in sources {
            bar.set_message(
                source
                    .path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default(),
            );

            if is_already_clipped(&source.path, &existing) {
                info!("{} already clipped", source.path.display());
                summary.skipped += 1;
                bar.inc(1);
                continue;
            }

            match self.clip_source(&source, dest_dir).await {
                Ok(true) => summary.completed += 1,
                Ok(false) => summary.skipped += 1,
                Err(e) => {
                    error!("Clipping failed for {}: {}", source.path.display(), e);
                    summary.failed += 1;
                }
            }
            bar.inc(1);
        }

        bar.finish_and_clear();
        Ok(summary)
    }

    /// Returns Ok(false) when the source is too short to yield any window.
    async fn clip_source(&self, source: &ClipSource, dest_dir: &Path) -> Result<bool> {
        let duration = match source.duration_secs {
            Some(duration) => duration,
            None => self.ffmpeg.get_duration(&source.path).await?,
        };

        let window_starts = schedule_window_starts(duration as u64, &self.config);
        if window_starts.is_empty() {
            warn!(
                "{} is too short ({}s) for any clip window",
                source.path.display(),
                duration as u64
            );
            return Ok(false);
        }

        let mut rng = rand::thread_rng();
        let clip_starts = jittered_clip_starts(&window_starts, &self.config, &mut rng);

        let probe = probe_color_metadata(&self.ffmpeg, &source.path).await?;
        let metadata = MetadataNormalizer::normalize(&probe);
        let hlg = metadata.color_transfer.is_hlg();

        let targets: Vec<EncodeTarget> = clip_starts
            .iter()
            .map(|&start| {
                let mut target = EncodeTarget::clip(
                    start,
                    self.config.clip_duration_secs,
                    self.config.bitrate_kbps,
                );
                target.convert_hlg_to_pq = hlg;
                target
            })
            .collect();

        let job = EncodeJob::new(&source.path, metadata, targets, dest_dir)?;
        let args = self.assembler.assemble(&job);

        if let Err(e) = self.ffmpeg.run_encode(&args).await {
            error!("ffmpeg arguments were: {:?}", args);
            return Err(e);
        }

        info!(
            "Cut {} into {} clip(s)",
            source.path.display(),
            job.output_paths.len()
        );
        Ok(true)
    }
}

/// Build the clip work list from either a scan manifest or a directory of
/// sources.
pub fn collect_clip_sources(input: &Path) -> Result<Vec<ClipSource>> {
    if input.extension().and_then(|e| e.to_str()) == Some("csv") {
        let manifest = super::scan::read_manifest(input)?;
        Ok(manifest
            .into_iter()
            .map(|row| ClipSource {
                path: row.path,
                duration_secs: Some(row.duration_secs),
            })
            .collect())
    } else {
        let files = crate::utils::find_video_files(input)?;
        if files.is_empty() {
            return Err(Error::validation(format!(
                "No video files under {}",
                input.display()
            )));
        }
        Ok(files
            .into_iter()
            .map(|path| ClipSource {
                path,
                duration_secs: None,
            })
            .collect())
    }
}
