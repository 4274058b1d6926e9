use std::collections::HashMap;

use tracing::warn;

use super::probe::ProbeResult;
use super::types::{
    ColorMetadata, ColorTransfer, MasteringDisplay, PixelFormat, Rational,
    DEFAULT_MASTERING_DISPLAY,
};

/// Frame rate used when the probe reports nothing parseable. Sources are
/// filtered to >= 50 fps upstream, so this is the floor of the dataset.
const FALLBACK_FRAME_RATE: Rational = Rational { num: 50, den: 1 };

pub struct MetadataNormalizer;

impl MetadataNormalizer {
    /// Turn raw probe output into a complete metadata record. This never
    /// fails: unusable input degrades to the default HDR10 table (whole
    /// mastering block) or to per-key defaults (keys missing after a
    /// structurally good parse), with a warning either way.
    pub fn normalize(probe: &ProbeResult) -> ColorMetadata {
        let frame_rate = match probe.frame_rate.as_deref().and_then(Rational::parse) {
            Some(rate) => rate,
            None => {
                warn!(
                    "Unusable frame rate {:?}, falling back to {}",
                    probe.frame_rate, FALLBACK_FRAME_RATE
                );
                FALLBACK_FRAME_RATE
            }
        };

        let mastering = match &probe.side_data {
            Some(side_data) => match Self::parse_mastering_block(side_data) {
                Some(md) => md,
                None => {
                    warn!("Malformed mastering display side data, using default table");
                    MasteringDisplay::hdr10_default()
                }
            },
            None => {
                warn!("No mastering display side data, using default table");
                MasteringDisplay::hdr10_default()
            }
        };

        ColorMetadata {
            mastering,
            frame_rate,
            color_transfer: ColorTransfer::from_probe(probe.color_transfer.as_deref()),
            pixel_format: PixelFormat::from_probe(probe.pix_fmt.as_deref()),
        }
    }

    /// Parse one mastering side-data block. Defaulting is all-or-nothing at
    /// this level: any present-but-malformed value invalidates the whole
    /// block (return None). Keys missing from an otherwise clean block are
    /// backfilled individually from the default table.
    fn parse_mastering_block(
        side_data: &HashMap<String, serde_json::Value>,
    ) -> Option<MasteringDisplay> {
        let mut values: HashMap<&str, String> = HashMap::new();

        for (key, default_value) in DEFAULT_MASTERING_DISPLAY {
            match side_data.get(*key) {
                Some(raw) => {
                    let numerator = Self::rational_numerator(raw)?;
                    values.insert(key, numerator);
                }
                None => {
                    values.insert(key, default_value.to_string());
                }
            }
        }

        let take = |key: &str| values.get(key).cloned().unwrap_or_default();

        Some(MasteringDisplay {
            green_x: take("green_x"),
            green_y: take("green_y"),
            blue_x: take("blue_x"),
            blue_y: take("blue_y"),
            red_x: take("red_x"),
            red_y: take("red_y"),
            white_point_x: take("white_point_x"),
            white_point_y: take("white_point_y"),
            max_luminance: take("max_luminance"),
            min_luminance: take("min_luminance"),
        })
    }

    /// The probe reports mastering values as rational strings ("13248/50000").
    /// Only the numerator is kept, denominator discarded, matching the
    /// behavior of the tooling this dataset was built with. A value that is
    /// not a string, or whose numerator is not an integer, is malformed.
    fn rational_numerator(raw: &serde_json::Value) -> Option<String> {
        let s = raw.as_str()?;
        let numerator = s.split('/').next().unwrap_or("").trim();
        numerator.parse::<u64>().ok()?;
        Some(numerator.to_string())
    }
}
