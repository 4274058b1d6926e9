use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

use crate::config::LadderConfig;
use crate::encoding::{CommandAssembler, EncodeJob, EncodeTarget, EncoderSettings};
use crate::metadata::{probe_color_metadata, MetadataNormalizer};
use crate::utils::filesystem::{ensure_dest_dir, existing_output_names, prune_partial_outputs};
use crate::utils::{Error, FfmpegWrapper, Result};

use super::RunSummary;

#[derive(Debug, Clone, PartialEq)]
pub struct LadderRendition {
    pub label: String,
    pub bitrate_mbps: f64,
    pub width: u32,
    pub height: u32,
}

/// The fixed bitrate/resolution table one source is compressed into.
/// Loaded once at startup, read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct BitrateLadder {
    pub renditions: Vec<LadderRendition>,
}

impl BitrateLadder {
    /// Parse `name,bitrate,w,h` rows. Bitrates are in Mbps. When
    /// `skip_reference_row` is set the first data row is dropped: it is the
    /// reference-rate conversion and the sources are already at that rate.
    pub fn from_csv_str(content: &str, skip_reference_row: bool) -> Result<Self> {
        let mut renditions = Vec::new();

        for (line_no, line) in content.lines().enumerate().skip(1) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if fields.len() != 4 {
                return Err(Error::parse(format!(
                    "Ladder line {} has {} fields, expected name,bitrate,w,h",
                    line_no + 1,
                    fields.len()
                )));
            }

            let bitrate_mbps: f64 = fields[1]
                .parse()
                .map_err(|_| Error::parse(format!("Bad ladder bitrate '{}'", fields[1])))?;
            let width: u32 = fields[2]
                .parse()
                .map_err(|_| Error::parse(format!("Bad ladder width '{}'", fields[2])))?;
            let height: u32 = fields[3]
                .parse()
                .map_err(|_| Error::parse(format!("Bad ladder height '{}'", fields[3])))?;

            if bitrate_mbps <= 0.0 {
                return Err(Error::validation(format!(
                    "Ladder rendition '{}' has non-positive bitrate",
                    fields[0]
                )));
            }

            renditions.push(LadderRendition {
                label: fields[0].to_string(),
                bitrate_mbps,
                width,
                height,
            });
        }

        if skip_reference_row && !renditions.is_empty() {
            renditions.remove(0);
        }

        if renditions.is_empty() {
            return Err(Error::validation("Bitrate ladder has no renditions"));
        }

        Ok(Self { renditions })
    }

    pub fn from_csv_path<P: AsRef<Path>>(path: P, skip_reference_row: bool) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_csv_str(&content, skip_reference_row)
    }

    pub fn targets(&self) -> Vec<EncodeTarget> {
        self.renditions
            .iter()
            .map(|r| {
                EncodeTarget::rendition(
                    r.label.clone(),
                    (r.bitrate_mbps * 1000.0).round() as u32,
                    r.width,
                    r.height,
                )
            })
            .collect()
    }
}

/// A source is done when every rendition name `label#source` is present.
/// Output names put the rendition label before `#`, so membership is
/// checked on the part after it.
pub fn pending_sources(sources: &[PathBuf], existing: &[String]) -> Vec<PathBuf> {
    let produced: Vec<&str> = existing
        .iter()
        .filter_map(|name| name.splitn(2, '#').nth(1))
        .collect();

    sources
        .iter()
        .filter(|source| {
            let name = source
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            !produced.contains(&name.as_str())
        })
        .cloned()
        .collect()
}

/// Drives the ladder table across a directory of clips, one multi-output
/// encoder invocation per source.
pub struct LadderRunner {
    ffmpeg: FfmpegWrapper,
    ladder: BitrateLadder,
    assembler: CommandAssembler,
}

impl LadderRunner {
    pub fn new(ffmpeg: FfmpegWrapper, ladder: BitrateLadder, config: &LadderConfig) -> Self {
        let assembler = CommandAssembler::new(EncoderSettings {
            preset: config.preset.clone(),
            pixel_format: config.pixel_format.clone(),
        });
        Self {
            ffmpeg,
            ladder,
            assembler,
        }
    }

    pub async fn run(&self, sources: Vec<PathBuf>, dest_dir: &Path) -> Result<RunSummary> {
        ensure_dest_dir(dest_dir)?;
        prune_partial_outputs(dest_dir)?;

        let existing = existing_output_names(dest_dir)?;
        let pending = pending_sources(&sources, &existing);
        let mut summary = RunSummary {
            skipped: sources.len() - pending.len(),
            ..Default::default()
        };

        info!(
            "Ladder run: {} source(s), {} already compressed",
            sources.len(),
            summary.skipped
        );

        let bar = ProgressBar::new(pending.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        for source in pending {
            bar.set_message(
                source
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default(),
            );

            match self.compress_source(&source, dest_dir).await {
                Ok(()) => summary.completed += 1,
                Err(e) => {
                    error!("Ladder encode failed for {}: {}", source.display(), e);
                    summary.failed += 1;
                }
            }
            bar.inc(1);
        }

        bar.finish_and_clear();
        Ok(summary)
    }

    async fn compress_source(&self, source: &Path, dest_dir: &Path) -> Result<()> {
        let probe = probe_color_metadata(&self.ffmpeg, source).await?;
        let metadata = MetadataNormalizer::normalize(&probe);

        let job = EncodeJob::new(source, metadata, self.ladder.targets(), dest_dir)?;
        let args = self.assembler.assemble(&job);

        if let Err(e) = self.ffmpeg.run_encode(&args).await {
            // keep the full argument set with the failure; the batch goes on
            error!("ffmpeg arguments were: {:?}", args);
            return Err(e);
        }

        info!(
            "Compressed {} into {} rendition(s)",
            source.display(),
            job.output_paths.len()
        );
        Ok(())
    }
}
