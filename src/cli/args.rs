use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version)]
#[command(name = "hdrset-prep")]
#[command(about = "HDR dataset preparation: select, clip, compress, and sample 4K HDR10 sources")]
#[command(long_about = "
Prepares an HDR video dataset for quality-assessment model training.

The stages run independently and feed each other through the filesystem:

  scan    probe a raw archive and write the manifest of pristine HDR 4K sources
  clips   cut manifest sources into jittered 10-second PQ scene clips
  ladder  compress each clip into the fixed bitrate/resolution ladder
  frames  sample decoded RGB frames out of the clips as .npy arrays

EXAMPLES:
  hdrset-prep scan -i ~/archive -m sources.csv
  hdrset-prep clips -i sources.csv -o ./clips
  hdrset-prep ladder -i ./clips -l bitladder.csv -o ./renditions
  hdrset-prep frames -i ./renditions -o ./frames --count 2
")]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file path
    #[arg(long, default_value = "config.yaml", value_name = "FILE", global = true)]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Select pristine HDR 4K sources from a raw archive into a manifest
    Scan {
        /// Directory of candidate videos
        #[arg(short, long, value_name = "DIR")]
        input: PathBuf,

        /// Manifest CSV to write
        #[arg(short, long, value_name = "FILE")]
        manifest: PathBuf,
    },

    /// Cut sources into short scene clips (HLG converted to PQ)
    Clips {
        /// Scan manifest CSV, or a directory of source videos
        #[arg(short, long, value_name = "PATH")]
        input: PathBuf,

        /// Destination directory for clips
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,
    },

    /// Compress clips into the bitrate/resolution ladder
    Ladder {
        /// Directory of clips
        #[arg(short, long, value_name = "DIR")]
        input: PathBuf,

        /// Bitrate ladder CSV (name,bitrate,w,h)
        #[arg(short, long, value_name = "FILE")]
        ladder: PathBuf,

        /// Destination directory for renditions
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,
    },

    /// Sample decoded RGB frames out of clips as .npy arrays
    Frames {
        /// Directory of clips or renditions
        #[arg(short, long, value_name = "DIR")]
        input: PathBuf,

        /// Destination directory for frame arrays
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,

        /// Frames to sample per clip (defaults to the configured value)
        #[arg(long, value_name = "N")]
        count: Option<usize>,
    },
}

impl CliArgs {
    pub fn log_level<'a>(&self, config_level: &'a str) -> &'a str {
        if self.debug || self.verbose {
            "debug"
        } else {
            config_level
        }
    }

    pub fn should_use_color(&self) -> bool {
        !self.no_color
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clips_command() {
        let args =
            CliArgs::parse_from(["hdrset-prep", "clips", "-i", "sources.csv", "-o", "clips/"]);
        match args.command {
            Command::Clips { input, output } => {
                assert_eq!(input, PathBuf::from("sources.csv"));
                assert_eq!(output, PathBuf::from("clips/"));
            }
            _ => panic!("expected clips subcommand"),
        }
    }

    #[test]
    fn test_log_level_precedence() {
        let args = CliArgs::parse_from(["hdrset-prep", "--debug", "scan", "-i", "a", "-m", "b"]);
        assert_eq!(args.log_level("info"), "debug");

        let args = CliArgs::parse_from(["hdrset-prep", "scan", "-i", "a", "-m", "b"]);
        assert_eq!(args.log_level("warn"), "warn");
    }

    #[test]
    fn test_frames_count_is_optional() {
        let args = CliArgs::parse_from(["hdrset-prep", "frames", "-i", "a", "-o", "b"]);
        match args.command {
            Command::Frames { count, .. } => assert_eq!(count, None),
            _ => panic!("expected frames subcommand"),
        }
    }
}
