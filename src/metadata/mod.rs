pub mod normalize;
pub mod probe;
pub mod types;

pub use normalize::MetadataNormalizer;
pub use probe::{probe_color_metadata, probe_video_stream, ProbeResult, VideoStreamProbe};
pub use types::{ColorMetadata, ColorTransfer, MasteringDisplay, PixelFormat, Rational};
