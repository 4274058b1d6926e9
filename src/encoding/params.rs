use crate::metadata::ColorMetadata;

use super::command::EncodeTarget;

/// Flat x265 parameter set for one output stream, derived from the source
/// metadata and one target. Ready for command assembly; building it has no
/// side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeParameters {
    pub keyint: u32,
    pub bitrate_kbps: u32,
    pub vbv_maxrate: u32,
    pub vbv_bufsize: u32,
    pub master_display: String,
    pub max_cll: String,
    pub level: String,
}

impl EncodeParameters {
    /// x265 option string in the fixed order the rest of the pipeline was
    /// tuned against. Every rendition of a ladder gets the same keyint, so
    /// renditions stay switch-compatible.
    pub fn x265_params(&self) -> String {
        [
            "hdr-opt=1".to_string(),
            "repeat-headers=1".to_string(),
            format!("keyint={}", self.keyint),
            "colorprim=bt2020".to_string(),
            "transfer=smpte2084".to_string(),
            "colormatrix=bt2020nc".to_string(),
            format!("master-display={}", self.master_display),
            format!("max-cll={}", self.max_cll),
            "strict-cbr=1".to_string(),
            format!("level={}", self.level),
            format!("vbv-maxrate={}", self.vbv_maxrate),
            format!("vbv-bufsize={}", self.vbv_bufsize),
        ]
        .join(":")
    }
}

pub struct EncodeParameterBuilder;

impl EncodeParameterBuilder {
    pub fn build(metadata: &ColorMetadata, target: &EncodeTarget) -> EncodeParameters {
        EncodeParameters {
            keyint: Self::keyframe_interval(metadata),
            bitrate_kbps: target.bitrate_kbps,
            vbv_maxrate: target.bitrate_kbps,
            // strict CBR with a buffer equivalent to two seconds at rate
            vbv_bufsize: target.bitrate_kbps * 2,
            master_display: Self::master_display_string(metadata),
            // content light level is never analyzed
            max_cll: "0,0".to_string(),
            level: target.level.clone(),
        }
    }

    /// Closed GOP every two seconds: keyint = round(2 * fps).
    pub fn keyframe_interval(metadata: &ColorMetadata) -> u32 {
        let fps = metadata.frame_rate.as_f64();
        (2.0 * fps).round() as u32
    }

    /// x265 master-display descriptor, fixed order Green, Blue, Red,
    /// White point, Luminance.
    pub fn master_display_string(metadata: &ColorMetadata) -> String {
        let md = &metadata.mastering;
        format!(
            "G({},{})B({},{})R({},{})WP({},{})L({},{})",
            md.green_x,
            md.green_y,
            md.blue_x,
            md.blue_y,
            md.red_x,
            md.red_y,
            md.white_point_x,
            md.white_point_y,
            md.max_luminance,
            md.min_luminance
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{ColorTransfer, MasteringDisplay, PixelFormat, Rational};
    use pretty_assertions::assert_eq;

    fn metadata_with_fps(num: u32, den: u32) -> ColorMetadata {
        ColorMetadata {
            mastering: MasteringDisplay::hdr10_default(),
            frame_rate: Rational::new(num, den),
            color_transfer: ColorTransfer::Smpte2084,
            pixel_format: PixelFormat::Yuv420p10Le,
        }
    }

    #[test]
    fn test_keyint_is_rounded_twice_fps() {
        assert_eq!(EncodeParameterBuilder::keyframe_interval(&metadata_with_fps(50, 1)), 100);
        // 2 * 59.94006 = 119.88 -> 120
        assert_eq!(
            EncodeParameterBuilder::keyframe_interval(&metadata_with_fps(60000, 1001)),
            120
        );
        // 2 * 23.976 = 47.952 -> 48
        assert_eq!(
            EncodeParameterBuilder::keyframe_interval(&metadata_with_fps(24000, 1001)),
            48
        );
        assert!(EncodeParameterBuilder::keyframe_interval(&metadata_with_fps(1, 1)) > 0);
    }

    #[test]
    fn test_buffer_is_twice_bitrate() {
        let target = EncodeTarget::rendition("4k_15mbps", 15000, 3840, 2160);
        let params = EncodeParameterBuilder::build(&metadata_with_fps(50, 1), &target);
        assert_eq!(params.vbv_maxrate, 15000);
        assert_eq!(params.vbv_bufsize, 30000);
    }

    #[test]
    fn test_master_display_order_and_defaults() {
        let md = EncodeParameterBuilder::master_display_string(&metadata_with_fps(50, 1));
        assert_eq!(
            md,
            "G(13248,34500)B(7500,3000)R(34000,16000)WP(15634,16450)L(10000000,50)"
        );
    }

    #[test]
    fn test_x265_params_string() {
        let target = EncodeTarget::rendition("1080p_6mbps", 6000, 1920, 1080);
        let params = EncodeParameterBuilder::build(&metadata_with_fps(50, 1), &target);
        let s = params.x265_params();

        assert_eq!(
            s,
            "hdr-opt=1:repeat-headers=1:keyint=100:colorprim=bt2020:transfer=smpte2084:\
             colormatrix=bt2020nc:master-display=G(13248,34500)B(7500,3000)R(34000,16000)\
             WP(15634,16450)L(10000000,50):max-cll=0,0:strict-cbr=1:level=5.1:\
             vbv-maxrate=6000:vbv-bufsize=12000"
        );
    }
}
