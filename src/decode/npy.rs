use std::io::Write;
use std::path::Path;

use crate::utils::Result;

use super::frame::DecodedFrame;

/// Persist one decoded frame as a NumPy `.npy` v1.0 array: little-endian
/// f32, C order, shape (height, width, 3) with interleaved R,G,B.
pub fn write_npy<P: AsRef<Path>>(path: P, frame: &DecodedFrame) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);

    writer.write_all(&npy_header(frame.height, frame.width))?;

    for idx in 0..frame.width * frame.height {
        writer.write_all(&frame.r[idx].to_le_bytes())?;
        writer.write_all(&frame.g[idx].to_le_bytes())?;
        writer.write_all(&frame.b[idx].to_le_bytes())?;
    }

    writer.flush()?;
    Ok(())
}

/// v1.0 header: magic, version, u16 header length, then the dict literal
/// padded with spaces so the data section starts 64-byte aligned.
fn npy_header(rows: usize, cols: usize) -> Vec<u8> {
    let dict = format!(
        "{{'descr': '<f4', 'fortran_order': False, 'shape': ({}, {}, 3), }}",
        rows, cols
    );

    let unpadded = 10 + dict.len() + 1;
    let padding = (64 - unpadded % 64) % 64;

    let mut header = Vec::with_capacity(unpadded + padding);
    header.extend_from_slice(b"\x93NUMPY");
    header.push(1);
    header.push(0);

    let dict_len = (dict.len() + padding + 1) as u16;
    header.extend_from_slice(&dict_len.to_le_bytes());
    header.extend_from_slice(dict.as_bytes());
    header.extend(std::iter::repeat(b' ').take(padding));
    header.push(b'\n');

    header
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_frame() -> DecodedFrame {
        DecodedFrame {
            width: 2,
            height: 2,
            r: vec![0.1, 0.2, 0.3, 0.4],
            g: vec![0.5, 0.5, 0.5, 0.5],
            b: vec![0.9, 0.8, 0.7, 0.6],
            source_clip: "clip".to_string(),
            frame_index: 0,
        }
    }

    #[test]
    fn test_header_layout() {
        let header = npy_header(2160, 3840);
        assert_eq!(&header[..6], b"\x93NUMPY");
        assert_eq!(header[6], 1);
        assert_eq!(header[7], 0);

        let dict_len = u16::from_le_bytes([header[8], header[9]]) as usize;
        assert_eq!(header.len(), 10 + dict_len);
        assert_eq!(header.len() % 64, 0);
        assert_eq!(*header.last().unwrap(), b'\n');

        let dict = String::from_utf8_lossy(&header[10..]);
        assert!(dict.starts_with("{'descr': '<f4'"));
        assert!(dict.contains("'shape': (2160, 3840, 3)"));
    }

    #[test]
    fn test_write_npy_roundtrip_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip_frame_0.npy");
        write_npy(&path, &tiny_frame()).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let dict_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        let data = &bytes[10 + dict_len..];
        assert_eq!(data.len(), 2 * 2 * 3 * 4);

        // first pixel is (r, g, b) interleaved
        let first = f32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let second = f32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        let third = f32::from_le_bytes([data[8], data[9], data[10], data[11]]);
        assert_eq!(first, 0.1);
        assert_eq!(second, 0.5);
        assert_eq!(third, 0.9);
    }
}
