use crate::metadata::PixelFormat;
use crate::utils::{Error, Result};

/// Quantization range of the decoded samples. Broadcast sources are
/// limited ("tv") range; the de-quantization constants follow the 10-bit
/// signal levels (black 64, white 940, full scale 1023).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelRange {
    Limited,
    Full,
}

impl PixelRange {
    pub fn from_probe(raw: Option<&str>) -> Self {
        match raw {
            Some("pc") | Some("full") => Self::Full,
            _ => Self::Limited,
        }
    }

    fn dequantize(&self, value: f32) -> f32 {
        match self {
            Self::Limited => (value - 64.0) / (940.0 - 64.0),
            Self::Full => value / 1023.0,
        }
    }
}

/// One fully decoded frame: three full-resolution planes, linear values
/// clamped to [0,1]. Chroma is upsampled to luma resolution before the
/// color conversion, never after.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub width: usize,
    pub height: usize,
    pub r: Vec<f32>,
    pub g: Vec<f32>,
    pub b: Vec<f32>,
    pub source_clip: String,
    pub frame_index: usize,
}

impl DecodedFrame {
    /// Decode one raw planar 4:2:0 frame buffer. Layout is Y full
    /// resolution, then U and V at quarter resolution; chroma is upsampled
    /// by nearest-neighbor 2x replication in both axes. The conversion is
    /// the fixed BT.2020-style matrix used across this dataset; no further
    /// colorimetric correction is applied.
    pub fn from_planar_yuv(
        data: &[u8],
        width: usize,
        height: usize,
        format: PixelFormat,
        range: PixelRange,
        source_clip: &str,
        frame_index: usize,
    ) -> Result<Self> {
        if !format.is_planar_yuv() {
            return Err(Error::decode(format!(
                "{} is not a planar YUV format",
                format.as_str()
            )));
        }
        if width % 2 != 0 || height % 2 != 0 {
            return Err(Error::decode(format!(
                "4:2:0 frames need even dimensions, got {}x{}",
                width, height
            )));
        }

        let expected = format.bytes_per_frame(width, height);
        if data.len() != expected {
            return Err(Error::decode(format!(
                "Frame buffer is {} bytes, expected {}",
                data.len(),
                expected
            )));
        }

        let luma_len = width * height;
        let chroma_w = width / 2;
        let chroma_len = chroma_w * (height / 2);

        let samples = read_samples(data, format);
        let y_plane = &samples[..luma_len];
        let u_plane = &samples[luma_len..luma_len + chroma_len];
        let v_plane = &samples[luma_len + chroma_len..];

        let mut r = vec![0.0f32; luma_len];
        let mut g = vec![0.0f32; luma_len];
        let mut b = vec![0.0f32; luma_len];

        for row in 0..height {
            let chroma_row = (row / 2) * chroma_w;
            for col in 0..width {
                let idx = row * width + col;
                let y = y_plane[idx];
                let cb = u_plane[chroma_row + col / 2] - 512.0;
                let cr = v_plane[chroma_row + col / 2] - 512.0;

                r[idx] = range.dequantize(y + 1.4747 * cr).clamp(0.0, 1.0);
                g[idx] = range
                    .dequantize(y - 0.1645 * cb - 0.5719 * cr)
                    .clamp(0.0, 1.0);
                b[idx] = range.dequantize(y + 1.8814 * cb).clamp(0.0, 1.0);
            }
        }

        Ok(Self {
            width,
            height,
            r,
            g,
            b,
            source_clip: source_clip.to_string(),
            frame_index,
        })
    }
}

fn read_samples(data: &[u8], format: PixelFormat) -> Vec<f32> {
    match format {
        PixelFormat::Yuv420p => data.iter().map(|&v| v as f32).collect(),
        PixelFormat::Yuv420p10Le => data
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]) as f32)
            .collect(),
        PixelFormat::Yuv420p10Be => data
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]) as f32)
            .collect(),
        // rejected before this point
        PixelFormat::Rgb48Le | PixelFormat::Rgb48Be => Vec::new(),
    }
}
