pub mod frame;
pub mod npy;
pub mod stream;

pub use frame::{DecodedFrame, PixelRange};
pub use stream::FrameStream;
