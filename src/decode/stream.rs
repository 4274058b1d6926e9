use std::io::Read;

use tracing::debug;

use crate::metadata::PixelFormat;
use crate::utils::{Error, Result};

use super::frame::{DecodedFrame, PixelRange};

/// Lazy, finite, non-restartable sequence of decoded frames read off a raw
/// planar byte stream. The stream carries no length markers; frames are
/// split purely by the computed frame size, and a short read at the tail is
/// the normal end of the sequence, not an error.
pub struct FrameStream<R: Read> {
    reader: R,
    width: usize,
    height: usize,
    format: PixelFormat,
    range: PixelRange,
    source_clip: String,
    frame_size: usize,
    buf: Vec<u8>,
    next_index: usize,
    done: bool,
}

impl<R: Read> FrameStream<R> {
    pub fn new(
        reader: R,
        width: usize,
        height: usize,
        format: PixelFormat,
        range: PixelRange,
        source_clip: &str,
    ) -> Result<Self> {
        if !format.is_planar_yuv() {
            return Err(Error::decode(format!(
                "Cannot frame-split {} as planar YUV",
                format.as_str()
            )));
        }
        if width == 0 || height == 0 || width % 2 != 0 || height % 2 != 0 {
            return Err(Error::decode(format!(
                "Invalid frame dimensions {}x{}",
                width, height
            )));
        }

        let frame_size = format.bytes_per_frame(width, height);

        Ok(Self {
            reader,
            width,
            height,
            format,
            range,
            source_clip: source_clip.to_string(),
            frame_size,
            buf: vec![0u8; frame_size],
            next_index: 0,
            done: false,
        })
    }

    /// Fill the frame buffer, or report end-of-stream. A partial tail frame
    /// is discarded.
    fn read_frame_bytes(&mut self) -> Result<bool> {
        let mut total_read = 0;

        while total_read < self.frame_size {
            match self.reader.read(&mut self.buf[total_read..]) {
                Ok(0) => {
                    if total_read > 0 {
                        debug!(
                            "Discarding partial tail frame ({}/{} bytes) of {}",
                            total_read, self.frame_size, self.source_clip
                        );
                    }
                    return Ok(false);
                }
                Ok(n) => total_read += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(true)
    }
}

impl<R: Read> Iterator for FrameStream<R> {
    type Item = Result<DecodedFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.read_frame_bytes() {
            Ok(false) => {
                self.done = true;
                None
            }
            Ok(true) => {
                let index = self.next_index;
                self.next_index += 1;
                Some(DecodedFrame::from_planar_yuv(
                    &self.buf,
                    self.width,
                    self.height,
                    self.format,
                    self.range,
                    &self.source_clip,
                    index,
                ))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
