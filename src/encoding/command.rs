use std::path::{Path, PathBuf};

use crate::metadata::ColorMetadata;
use crate::utils::{Error, Result};

use super::params::EncodeParameterBuilder;

pub const DEFAULT_LEVEL: &str = "5.1";

/// HEVC levels the encoder accepts for this pipeline's profiles.
const KNOWN_LEVELS: &[&str] = &["4", "4.1", "5", "5.1", "5.2", "6", "6.1", "6.2"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipTrim {
    pub start_secs: u64,
    pub duration_secs: u64,
}

/// One desired output: a ladder rendition or a trimmed sub-clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeTarget {
    /// Used in the output filename.
    pub label: String,
    pub bitrate_kbps: u32,
    /// 0,0 means no scaling.
    pub width: u32,
    pub height: u32,
    pub level: String,
    pub trim: Option<ClipTrim>,
    /// Set when the source is HLG and must come out as PQ.
    pub convert_hlg_to_pq: bool,
}

impl EncodeTarget {
    pub fn rendition<S: Into<String>>(label: S, bitrate_kbps: u32, width: u32, height: u32) -> Self {
        Self {
            label: label.into(),
            bitrate_kbps,
            width,
            height,
            level: DEFAULT_LEVEL.to_string(),
            trim: None,
            convert_hlg_to_pq: false,
        }
    }

    pub fn clip(start_secs: u64, duration_secs: u64, bitrate_kbps: u32) -> Self {
        Self {
            label: start_secs.to_string(),
            bitrate_kbps,
            width: 0,
            height: 0,
            level: DEFAULT_LEVEL.to_string(),
            trim: Some(ClipTrim {
                start_secs,
                duration_secs,
            }),
            convert_hlg_to_pq: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.label.is_empty() {
            return Err(Error::validation("Target label must not be empty"));
        }
        if self.bitrate_kbps == 0 {
            return Err(Error::validation(format!(
                "Target '{}' has zero bitrate",
                self.label
            )));
        }
        if (self.width == 0) != (self.height == 0) {
            return Err(Error::validation(format!(
                "Target '{}' must scale both dimensions or neither ({}x{})",
                self.label, self.width, self.height
            )));
        }
        if !KNOWN_LEVELS.contains(&self.level.as_str()) {
            return Err(Error::validation(format!(
                "Target '{}' has unknown codec level '{}'",
                self.label, self.level
            )));
        }
        if let Some(trim) = &self.trim {
            if trim.duration_secs == 0 {
                return Err(Error::validation(format!(
                    "Target '{}' has zero clip duration",
                    self.label
                )));
            }
        }
        Ok(())
    }
}

/// The unit of work handed to the encoder: one source, one metadata record,
/// N targets, N output paths, one process invocation. All outputs share the
/// source's single decode pass and the keyint derived once from its frame
/// rate.
#[derive(Debug, Clone)]
pub struct EncodeJob {
    pub source: PathBuf,
    pub metadata: ColorMetadata,
    pub targets: Vec<EncodeTarget>,
    pub output_paths: Vec<PathBuf>,
}

impl EncodeJob {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        source: P,
        metadata: ColorMetadata,
        targets: Vec<EncodeTarget>,
        dest_dir: Q,
    ) -> Result<Self> {
        let source = source.as_ref().to_path_buf();
        let dest_dir = dest_dir.as_ref();

        if targets.is_empty() {
            return Err(Error::validation(format!(
                "No targets for {}",
                source.display()
            )));
        }

        let trimmed = targets.iter().filter(|t| t.trim.is_some()).count();
        if trimmed != 0 && trimmed != targets.len() {
            return Err(Error::validation(
                "A job must be all ladder renditions or all clips",
            ));
        }

        for target in &targets {
            target.validate()?;
        }

        let source_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::validation(format!("Unusable source path {}", source.display())))?;
        let source_stem = source
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or(source_name);

        let output_paths = targets
            .iter()
            .map(|target| match &target.trim {
                Some(trim) => dest_dir.join(format!("{}_{}.mp4", source_stem, trim.start_secs)),
                None => dest_dir.join(format!("{}#{}", target.label, source_name)),
            })
            .collect();

        Ok(Self {
            source,
            metadata,
            targets,
            output_paths,
        })
    }

    pub fn is_clip_mode(&self) -> bool {
        self.targets.first().is_some_and(|t| t.trim.is_some())
    }
}

#[derive(Debug, Clone)]
pub struct EncoderSettings {
    pub preset: String,
    pub pixel_format: String,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            preset: "slow".to_string(),
            pixel_format: "yuv420p10le".to_string(),
        }
    }
}

/// Builds the single ffmpeg invocation that produces every output of a job
/// at once. Ladder mode scales each output independently off the shared
/// decode; clip mode trims N time-disjoint sub-streams in one filter graph.
pub struct CommandAssembler {
    settings: EncoderSettings,
}

impl CommandAssembler {
    pub fn new(settings: EncoderSettings) -> Self {
        Self { settings }
    }

    pub fn assemble(&self, job: &EncodeJob) -> Vec<String> {
        if job.is_clip_mode() {
            self.assemble_clip_graph(job)
        } else {
            self.assemble_ladder(job)
        }
    }

    fn assemble_ladder(&self, job: &EncodeJob) -> Vec<String> {
        let mut args = vec!["-i".to_string(), job.source.to_string_lossy().to_string()];

        for (target, output) in job.targets.iter().zip(&job.output_paths) {
            let params = EncodeParameterBuilder::build(&job.metadata, target);

            if target.width > 0 {
                args.push("-vf".to_string());
                args.push(format!("scale={}:{}", target.width, target.height));
            }
            args.extend([
                "-an".to_string(),
                "-map".to_string(),
                "0".to_string(),
                "-c:v".to_string(),
                "libx265".to_string(),
                "-profile:v".to_string(),
                "main10".to_string(),
                "-b:v".to_string(),
                format!("{}k", params.bitrate_kbps),
                "-map_metadata".to_string(),
                "0".to_string(),
                "-x265-params".to_string(),
                params.x265_params(),
                "-preset".to_string(),
                self.settings.preset.clone(),
                "-pix_fmt".to_string(),
                self.settings.pixel_format.clone(),
                output.to_string_lossy().to_string(),
            ]);
        }

        args
    }

    fn assemble_clip_graph(&self, job: &EncodeJob) -> Vec<String> {
        let mut filters: Vec<String> = job
            .targets
            .iter()
            .enumerate()
            .map(|(i, target)| {
                let trim = target.trim.unwrap_or(ClipTrim {
                    start_secs: 0,
                    duration_secs: 0,
                });
                format!(
                    "[0:v]trim={}:{},setpts=PTS-STARTPTS[v{}]",
                    trim.start_secs,
                    trim.start_secs + trim.duration_secs,
                    i
                )
            })
            .collect();

        for (i, target) in job.targets.iter().enumerate() {
            if target.convert_hlg_to_pq {
                filters.push(format!(
                    "[v{}]zscale=transfer=smpte2084:transferin=arib-std-b67[outv{}]",
                    i, i
                ));
            }
        }

        let mut args = vec![
            "-i".to_string(),
            job.source.to_string_lossy().to_string(),
            "-filter_complex".to_string(),
            filters.join(";"),
        ];

        for (i, (target, output)) in job.targets.iter().zip(&job.output_paths).enumerate() {
            let params = EncodeParameterBuilder::build(&job.metadata, target);
            let pad = if target.convert_hlg_to_pq {
                format!("[outv{}]", i)
            } else {
                format!("[v{}]", i)
            };

            args.extend([
                "-map".to_string(),
                pad,
                "-map_metadata".to_string(),
                "0".to_string(),
                "-c:v".to_string(),
                "libx265".to_string(),
                "-profile:v".to_string(),
                "main10".to_string(),
                "-b:v".to_string(),
                format!("{}k", params.bitrate_kbps),
                "-minrate".to_string(),
                format!("{}k", params.bitrate_kbps),
                "-maxrate".to_string(),
                format!("{}k", params.bitrate_kbps),
                "-bufsize".to_string(),
                format!("{}k", params.vbv_bufsize),
                "-x265-params".to_string(),
                params.x265_params(),
                output.to_string_lossy().to_string(),
            ]);
        }

        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{ColorTransfer, MasteringDisplay, PixelFormat, Rational};
    use pretty_assertions::assert_eq;

    fn pq_metadata() -> ColorMetadata {
        ColorMetadata {
            mastering: MasteringDisplay::hdr10_default(),
            frame_rate: Rational::new(50, 1),
            color_transfer: ColorTransfer::Smpte2084,
            pixel_format: PixelFormat::Yuv420p10Le,
        }
    }

    fn ladder_targets() -> Vec<EncodeTarget> {
        vec![
            EncodeTarget::rendition("4k_15mbps", 15000, 3840, 2160),
            EncodeTarget::rendition("1080p_6mbps", 6000, 1920, 1080),
            EncodeTarget::rendition("720p_2600kbps", 2600, 1280, 720),
        ]
    }

    #[test]
    fn test_ladder_output_naming() {
        let job = EncodeJob::new(
            "/videos/sunset_600.mp4",
            pq_metadata(),
            ladder_targets(),
            "/out",
        )
        .unwrap();

        assert_eq!(job.output_paths.len(), 3);
        assert_eq!(
            job.output_paths[0],
            PathBuf::from("/out/4k_15mbps#sunset_600.mp4")
        );
        assert_eq!(
            job.output_paths[1],
            PathBuf::from("/out/1080p_6mbps#sunset_600.mp4")
        );

        // all outputs distinct, each prefixed by its label before '#'
        for (target, path) in job.targets.iter().zip(&job.output_paths) {
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            assert!(name.starts_with(&format!("{}#", target.label)));
        }
    }

    #[test]
    fn test_ladder_assembly_reads_input_once() {
        let job = EncodeJob::new("/videos/a.mp4", pq_metadata(), ladder_targets(), "/out").unwrap();
        let args = CommandAssembler::new(EncoderSettings::default()).assemble(&job);

        assert_eq!(args.iter().filter(|a| *a == "-i").count(), 1);
        assert_eq!(args.iter().filter(|a| *a == "-c:v").count(), 3);
        assert_eq!(args.iter().filter(|a| a.contains("scale=")).count(), 3);
        assert!(args.contains(&"scale=1280:720".to_string()));
        assert!(args.contains(&"-pix_fmt".to_string()));
        assert!(args.contains(&"yuv420p10le".to_string()));
    }

    #[test]
    fn test_unscaled_rendition_has_no_scale_filter() {
        let job = EncodeJob::new(
            "/videos/a.mp4",
            pq_metadata(),
            vec![EncodeTarget::rendition("ref_50mbps", 50000, 0, 0)],
            "/out",
        )
        .unwrap();
        let args = CommandAssembler::new(EncoderSettings::default()).assemble(&job);
        assert!(!args.iter().any(|a| a.contains("scale=")));
    }

    #[test]
    fn test_clip_graph_single_invocation() {
        let targets = vec![
            EncodeTarget::clip(73, 10, 50000),
            EncodeTarget::clip(231, 10, 50000),
            EncodeTarget::clip(301, 10, 50000),
        ];
        let job = EncodeJob::new("/videos/ocean_480.mp4", pq_metadata(), targets, "/clips").unwrap();
        let args = CommandAssembler::new(EncoderSettings::default()).assemble(&job);

        assert_eq!(args.iter().filter(|a| *a == "-i").count(), 1);
        assert_eq!(args.iter().filter(|a| *a == "-filter_complex").count(), 1);

        let graph = &args[args.iter().position(|a| a == "-filter_complex").unwrap() + 1];
        assert_eq!(graph.matches("trim=").count(), 3);
        assert!(graph.contains("[0:v]trim=73:83,setpts=PTS-STARTPTS[v0]"));
        assert!(graph.contains("[0:v]trim=231:241,setpts=PTS-STARTPTS[v1]"));

        assert_eq!(
            job.output_paths,
            vec![
                PathBuf::from("/clips/ocean_480_73.mp4"),
                PathBuf::from("/clips/ocean_480_231.mp4"),
                PathBuf::from("/clips/ocean_480_301.mp4"),
            ]
        );
    }

    #[test]
    fn test_hlg_source_gets_pq_conversion_per_substream() {
        let mut metadata = pq_metadata();
        metadata.color_transfer = ColorTransfer::AribStdB67;

        let mut targets = vec![
            EncodeTarget::clip(60, 10, 50000),
            EncodeTarget::clip(190, 10, 50000),
        ];
        for t in &mut targets {
            t.convert_hlg_to_pq = true;
        }

        let job = EncodeJob::new("/videos/hlg.mp4", metadata, targets, "/clips").unwrap();
        let args = CommandAssembler::new(EncoderSettings::default()).assemble(&job);

        let graph = &args[args.iter().position(|a| a == "-filter_complex").unwrap() + 1];
        assert_eq!(graph.matches("zscale=transfer=smpte2084").count(), 2);
        assert!(graph.contains("[v0]zscale=transfer=smpte2084:transferin=arib-std-b67[outv0]"));
        assert!(args.contains(&"[outv1]".to_string()));
        assert!(!args.contains(&"[v1]".to_string()));
    }

    #[test]
    fn test_clip_cbr_bounds() {
        let job = EncodeJob::new(
            "/videos/a.mp4",
            pq_metadata(),
            vec![EncodeTarget::clip(60, 10, 50000)],
            "/clips",
        )
        .unwrap();
        let args = CommandAssembler::new(EncoderSettings::default()).assemble(&job);

        let expect = ["-b:v", "-minrate", "-maxrate"];
        for flag in expect {
            let idx = args.iter().position(|a| a == flag).unwrap();
            assert_eq!(args[idx + 1], "50000k");
        }
        let idx = args.iter().position(|a| a == "-bufsize").unwrap();
        assert_eq!(args[idx + 1], "100000k");
    }

    #[test]
    fn test_job_rejects_mixed_modes() {
        let targets = vec![
            EncodeTarget::rendition("4k", 15000, 3840, 2160),
            EncodeTarget::clip(60, 10, 50000),
        ];
        assert!(EncodeJob::new("/v/a.mp4", pq_metadata(), targets, "/out").is_err());
    }

    #[test]
    fn test_target_validation() {
        assert!(EncodeTarget::rendition("x", 0, 0, 0).validate().is_err());
        assert!(EncodeTarget::rendition("x", 1000, 1920, 0).validate().is_err());
        assert!(EncodeTarget::rendition("x", 1000, 0, 0).validate().is_ok());
        assert!(EncodeTarget::clip(60, 0, 50000).validate().is_err());

        let mut bad_level = EncodeTarget::rendition("x", 1000, 0, 0);
        bad_level.level = "9.9".to_string();
        assert!(bad_level.validate().is_err());
    }
}
