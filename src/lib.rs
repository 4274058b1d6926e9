pub mod cli;
pub mod config;
pub mod decode;
pub mod encoding;
pub mod metadata;
pub mod pipeline;
pub mod utils;

pub use config::Config;
pub use decode::{DecodedFrame, FrameStream, PixelRange};
pub use encoding::{ClipTrim, CommandAssembler, EncodeJob, EncodeParameterBuilder, EncodeTarget};
pub use metadata::{ColorMetadata, ColorTransfer, MasteringDisplay, MetadataNormalizer, PixelFormat, Rational};
pub use pipeline::{BitrateLadder, ClipRunner, FrameSampler, LadderRunner, SourceScanner};
pub use utils::{Error, FfmpegWrapper, Result};
