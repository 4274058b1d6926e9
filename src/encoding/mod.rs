pub mod command;
pub mod params;

pub use command::{ClipTrim, CommandAssembler, EncodeJob, EncodeTarget, EncoderSettings};
pub use params::{EncodeParameterBuilder, EncodeParameters};
