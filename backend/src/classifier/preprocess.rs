use image::imageops::FilterType;
use tch::Tensor;

use super::model::ClassifierError;

pub const INPUT_SIZE: u32 = 224;

/// Decodes an uploaded image and lays it out the way the network was trained:
/// 224x224 pixels, channel-first, with a leading batch axis. Pixel values are
/// scaled to [0, 1]; channel order stays as the decoder produced it.
pub fn preprocess(raw_bytes: &[u8]) -> Result<Tensor, ClassifierError> {
    let decoded = image::load_from_memory(raw_bytes)
        .map_err(|e| ClassifierError::Decode(e.to_string()))?;

    let resized = decoded
        .resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::Triangle)
        .to_rgb8();

    // HWC as decoded -> CHW, then a leading batch axis of one.
    let raw = resized.into_raw();
    let plane = (INPUT_SIZE * INPUT_SIZE) as usize;
    let mut chw = vec![0.0f32; 3 * plane];
    for c in 0..3 {
        for i in 0..plane {
            chw[c * plane + i] = raw[i * 3 + c] as f32 / 255.0;
        }
    }

    let tensor =
        Tensor::from_slice(&chw).view([1, 3, INPUT_SIZE as i64, INPUT_SIZE as i64]);

    Ok(tensor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 64])
        });
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn output_shape_is_nchw_regardless_of_input_resolution() {
        for (w, h) in [(64, 48), (224, 224), (1280, 720)] {
            let tensor = preprocess(&encode_png(w, h)).unwrap();
            assert_eq!(tensor.size(), vec![1, 3, 224, 224]);
        }
    }

    #[test]
    fn pixel_values_are_scaled_to_unit_range() {
        let tensor = preprocess(&encode_png(32, 32)).unwrap();
        let max = tensor.max().double_value(&[]);
        let min = tensor.min().double_value(&[]);
        assert!(min >= 0.0 && max <= 1.0);
    }

    #[test]
    fn channels_lead_the_spatial_axes() {
        let img = image::RgbImage::from_pixel(64, 64, image::Rgb([200, 100, 50]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();

        let tensor = preprocess(&buf).unwrap();
        assert!((tensor.double_value(&[0, 0, 10, 10]) - 200.0 / 255.0).abs() < 1e-3);
        assert!((tensor.double_value(&[0, 1, 10, 10]) - 100.0 / 255.0).abs() < 1e-3);
        assert!((tensor.double_value(&[0, 2, 10, 10]) - 50.0 / 255.0).abs() < 1e-3);
    }

    #[test]
    fn undecodable_bytes_fail_with_decode_error() {
        let err = preprocess(b"definitely not an image").unwrap_err();
        assert!(matches!(err, ClassifierError::Decode(_)));
    }
}
