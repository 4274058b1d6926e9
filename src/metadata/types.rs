use serde::{Deserialize, Serialize};

/// Industry-standard HDR10 mastering display used whenever probing fails or
/// the source carries no usable side data. Chromaticity coordinates are
/// denominator-normalized integers (0.00002 steps), luminance values are in
/// 1/10000 cd/m².
pub const DEFAULT_MASTERING_DISPLAY: &[(&str, &str)] = &[
    ("green_x", "13248"),
    ("green_y", "34500"),
    ("blue_x", "7500"),
    ("blue_y", "3000"),
    ("red_x", "34000"),
    ("red_y", "16000"),
    ("white_point_x", "15634"),
    ("white_point_y", "16450"),
    ("max_luminance", "10000000"),
    ("min_luminance", "50"),
];

/// Frame rate as reported by the probe, kept exact. 59.94 fps arrives as
/// 60000/1001 and must not be rounded through a float on the way in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rational {
    pub num: u32,
    pub den: u32,
}

impl Rational {
    pub fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    /// Strict `integer[/integer]` parser. Floats, signs, and arithmetic
    /// expressions are rejected rather than evaluated.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let (num_str, den_str) = match s.split_once('/') {
            Some((n, d)) => (n, d),
            None => (s, "1"),
        };

        let num: u32 = num_str.parse().ok()?;
        let den: u32 = den_str.parse().ok()?;
        if num == 0 || den == 0 {
            return None;
        }

        Some(Self { num, den })
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

impl std::fmt::Display for Rational {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorTransfer {
    /// PQ, the HDR10 transfer. All encoded outputs use this.
    Smpte2084,
    /// HLG. Converted to PQ before any clip encode.
    AribStdB67,
    Other(String),
}

impl ColorTransfer {
    pub fn from_probe(raw: Option<&str>) -> Self {
        match raw {
            Some("smpte2084") => Self::Smpte2084,
            Some("arib-std-b67") => Self::AribStdB67,
            Some(other) => Self::Other(other.to_string()),
            None => Self::Other("unknown".to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Smpte2084 => "smpte2084",
            Self::AribStdB67 => "arib-std-b67",
            Self::Other(s) => s,
        }
    }

    pub fn is_hlg(&self) -> bool {
        matches!(self, Self::AribStdB67)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Yuv420p,
    Yuv420p10Le,
    Yuv420p10Be,
    Rgb48Le,
    Rgb48Be,
}

impl PixelFormat {
    pub fn from_probe(raw: Option<&str>) -> Self {
        match raw {
            Some("yuv420p") | Some("yuvj420p") => Self::Yuv420p,
            Some("yuv420p10le") => Self::Yuv420p10Le,
            Some("yuv420p10be") => Self::Yuv420p10Be,
            Some("rgb48le") => Self::Rgb48Le,
            Some("rgb48be") => Self::Rgb48Be,
            Some(other) => {
                tracing::warn!("Unrecognized pixel format '{}', assuming yuv420p10le", other);
                Self::Yuv420p10Le
            }
            None => Self::Yuv420p10Le,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yuv420p => "yuv420p",
            Self::Yuv420p10Le => "yuv420p10le",
            Self::Yuv420p10Be => "yuv420p10be",
            Self::Rgb48Le => "rgb48le",
            Self::Rgb48Be => "rgb48be",
        }
    }

    pub fn bit_depth(&self) -> u8 {
        match self {
            Self::Yuv420p => 8,
            Self::Yuv420p10Le | Self::Yuv420p10Be => 10,
            Self::Rgb48Le | Self::Rgb48Be => 16,
        }
    }

    /// Exact size of one raw frame on the decode pipe. 4:2:0 planar frames
    /// carry 1.5 samples per pixel, so the dimensions must be even.
    pub fn bytes_per_frame(&self, width: usize, height: usize) -> usize {
        match self {
            Self::Yuv420p => width * height * 3 / 2,
            Self::Yuv420p10Le | Self::Yuv420p10Be => width * height * 3,
            Self::Rgb48Le | Self::Rgb48Be => width * height * 6,
        }
    }

    pub fn is_planar_yuv(&self) -> bool {
        matches!(self, Self::Yuv420p | Self::Yuv420p10Le | Self::Yuv420p10Be)
    }
}

/// HDR10 static mastering display block. Values are kept as the probe's
/// integer strings so the encoder sees exactly what the source declared
/// (or the default table, never a rounded float).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasteringDisplay {
    pub green_x: String,
    pub green_y: String,
    pub blue_x: String,
    pub blue_y: String,
    pub red_x: String,
    pub red_y: String,
    pub white_point_x: String,
    pub white_point_y: String,
    pub max_luminance: String,
    pub min_luminance: String,
}

impl MasteringDisplay {
    pub fn hdr10_default() -> Self {
        let get = |key: &str| -> String {
            DEFAULT_MASTERING_DISPLAY
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
                .unwrap_or_default()
        };

        Self {
            green_x: get("green_x"),
            green_y: get("green_y"),
            blue_x: get("blue_x"),
            blue_y: get("blue_y"),
            red_x: get("red_x"),
            red_y: get("red_y"),
            white_point_x: get("white_point_x"),
            white_point_y: get("white_point_y"),
            max_luminance: get("max_luminance"),
            min_luminance: get("min_luminance"),
        }
    }
}

/// Complete color signaling for one source video. Every field is always
/// populated: absent or malformed probe data is replaced by defaults at
/// construction, never left empty. Rebuilt per invocation, immutable after.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorMetadata {
    pub mastering: MasteringDisplay,
    pub frame_rate: Rational,
    pub color_transfer: ColorTransfer,
    pub pixel_format: PixelFormat,
}
