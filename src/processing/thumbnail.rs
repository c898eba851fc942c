//! Thumbnail encoding

use crate::processing::decoder::RasterFrame;
use crate::utils::error::{MediaError, MediaResult};

pub const THUMBNAIL_MIME: &str = "image/png";

/// Time at which to grab the thumbnail frame
///
/// Uses `probe_secs` when the source is longer than that, otherwise the
/// middle of the source.
pub fn thumbnail_probe_time(duration: f64, probe_secs: f64) -> f64 {
    if !duration.is_finite() || duration <= 0.0 {
        return 0.0;
    }
    if duration > probe_secs {
        probe_secs
    } else {
        duration / 2.0
    }
}

/// Encode a frame as PNG
pub fn encode_png(frame: &RasterFrame) -> MediaResult<Vec<u8>> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, frame.width, frame.height);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(png::Compression::Best);

        let mut writer = encoder
            .write_header()
            .map_err(|e| MediaError::ThumbnailExtraction(format!("PNG header error: {}", e)))?;
        writer
            .write_image_data(&frame.rgb)
            .map_err(|e| MediaError::ThumbnailExtraction(format!("PNG encode error: {}", e)))?;
        writer
            .finish()
            .map_err(|e| MediaError::ThumbnailExtraction(format!("PNG finish error: {}", e)))?;
    }
    Ok(out)
}

/// Decode a PNG frame into packed RGB
pub fn decode_png(data: &[u8]) -> MediaResult<RasterFrame> {
    let mut decoder = png::Decoder::new(data);
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder
        .read_info()
        .map_err(|e| MediaError::ThumbnailExtraction(format!("PNG decode error: {}", e)))?;

    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e| MediaError::ThumbnailExtraction(format!("PNG frame error: {}", e)))?;
    let samples = &buf[..info.buffer_size()];

    // Drop alpha and widen gray to RGB
    let rgb = match info.color_type {
        png::ColorType::Rgb => samples.to_vec(),
        png::ColorType::Rgba => samples
            .chunks(4)
            .flat_map(|px| px[..3].iter().copied())
            .collect(),
        png::ColorType::Grayscale => samples.iter().flat_map(|&v| [v, v, v]).collect(),
        png::ColorType::GrayscaleAlpha => samples.chunks(2).flat_map(|px| [px[0], px[0], px[0]]).collect(),
        other => {
            return Err(MediaError::ThumbnailExtraction(format!(
                "Unsupported PNG color type: {:?}",
                other
            )));
        }
    };

    RasterFrame::new(info.width, info.height, rgb)
}
