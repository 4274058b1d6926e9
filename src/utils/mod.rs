pub mod error;
pub mod ffmpeg;
pub mod filesystem;
pub mod logging;

pub use error::{Error, Result};
pub use ffmpeg::FfmpegWrapper;
pub use filesystem::{find_video_files, prune_partial_outputs};
pub use logging::setup_logging;
