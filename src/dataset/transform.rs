use burn::prelude::*;
use image::RgbImage;
use image::imageops::FilterType;

use crate::error::ShapeError;

/// Deterministic preprocessing applied identically to an image and its mask:
/// interpolation resize to a fixed resolution, channel-first layout, values
/// scaled to [0, 1].
///
/// Resizing never crops, so pixel correspondence between image and mask is
/// preserved. No randomness is introduced here for the same reason.
#[derive(Config, Debug)]
pub struct SampleTransform {
    #[config(default = "[256, 256]")]
    pub target_size: [usize; 2],
}

impl SampleTransform {
    /// Map a decoded RGB image to channel-first `[3, H, W]` float data.
    pub fn apply(&self, image: &RgbImage) -> Result<Vec<f32>, ShapeError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(ShapeError::ZeroDimension { width, height });
        }

        let [target_h, target_w] = self.target_size;
        let resized = image::imageops::resize(
            image,
            target_w as u32,
            target_h as u32,
            FilterType::Triangle,
        );

        let mut data = vec![0.0f32; 3 * target_h * target_w];
        for (x, y, pixel) in resized.enumerate_pixels() {
            let offset = y as usize * target_w + x as usize;
            for c in 0..3 {
                data[c * target_h * target_w + offset] = pixel[c] as f32 / 255.0;
            }
        }

        Ok(data)
    }

    /// Transform an image into a `[3, H, W]` tensor on the given device.
    pub fn to_tensor<B: Backend>(
        &self,
        image: &RgbImage,
        device: &B::Device,
    ) -> Result<Tensor<B, 3>, ShapeError> {
        let [height, width] = self.target_size;
        let data = self.apply(image)?;

        Ok(Tensor::from_data(
            TensorData::new(data, Shape::new([3, height, width])).convert::<B::FloatElem>(),
            device,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn image_and_mask_share_spatial_dimensions() {
        let transform = SampleTransform::new().with_target_size([32, 32]);
        let image = RgbImage::from_pixel(100, 60, Rgb([200, 10, 30]));
        let mask = RgbImage::from_pixel(100, 60, Rgb([0, 0, 7]));

        let image_data = transform.apply(&image).unwrap();
        let mask_data = transform.apply(&mask).unwrap();

        assert_eq!(image_data.len(), 3 * 32 * 32);
        assert_eq!(mask_data.len(), 3 * 32 * 32);
    }

    #[test]
    fn values_are_scaled_to_unit_interval() {
        let transform = SampleTransform::new().with_target_size([16, 16]);
        let image = RgbImage::from_pixel(16, 16, Rgb([255, 0, 128]));

        let data = transform.apply(&image).unwrap();
        assert!(data.iter().all(|&v| (0.0..=1.0).contains(&v)));
        // Channel-first: the red plane comes first and holds 255/255.
        assert_eq!(data[0], 1.0);
        assert_eq!(data[16 * 16], 0.0);
    }

    #[test]
    fn transform_is_deterministic() {
        let transform = SampleTransform::new().with_target_size([24, 24]);
        let image = RgbImage::from_fn(50, 40, |x, y| Rgb([x as u8, y as u8, (x + y) as u8]));

        let first = transform.apply(&image).unwrap();
        let second = transform.apply(&image).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn zero_dimension_input_is_rejected() {
        let transform = SampleTransform::new();
        let image = RgbImage::new(0, 10);
        assert!(matches!(
            transform.apply(&image),
            Err(ShapeError::ZeroDimension { .. })
        ));
    }
}
