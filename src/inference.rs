use std::path::Path;

use burn::prelude::*;
use image::RgbImage;
use tracing::debug;

use crate::dataset::SampleTransform;
use crate::error::InferenceError;
use crate::model::SegmentationModel;
use crate::training::checkpoint;

/// The designated output channel of a single image, at the training
/// resolution, in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictedMask {
    pub data: Vec<f32>,
    pub height: usize,
    pub width: usize,
}

/// Serving-time path: replays the exact training-time preprocessing (same
/// resolution, channel ordering and [0,1] scaling, read from the checkpoint
/// metadata) on a single image, runs an evaluation-mode forward pass and
/// extracts the recorded mask channel.
///
/// `B` should be a non-autodiff backend; no backward graph is ever built.
pub struct InferenceAdapter<B: Backend> {
    device: B::Device,
    model: Option<SegmentationModel<B>>,
    transform: SampleTransform,
    mask_channel: usize,
}

impl<B: Backend> InferenceAdapter<B> {
    pub fn new(device: B::Device) -> Self {
        Self {
            device,
            model: None,
            transform: SampleTransform::new(),
            mask_channel: 0,
        }
    }

    /// Restore a checkpoint by file stem; preprocessing parameters and the
    /// mask-channel convention are taken from its metadata.
    pub fn restore(&mut self, stem: &Path) -> Result<(), InferenceError> {
        let (model, meta) = checkpoint::load::<B>(stem, &self.device)?;

        if meta.mask_channel >= meta.model.output_channels {
            return Err(InferenceError::InvalidMaskChannel {
                channel: meta.mask_channel,
                available: meta.model.output_channels,
            });
        }

        debug!(
            mask_channel = meta.mask_channel,
            image_size = ?meta.image_size,
            "checkpoint restored"
        );

        self.transform = SampleTransform::new().with_target_size(meta.image_size);
        self.mask_channel = meta.mask_channel;
        self.model = Some(model);

        Ok(())
    }

    /// Predict the mask channel for an image on disk.
    pub fn predict(&self, path: &Path) -> Result<PredictedMask, InferenceError> {
        let image = image::open(path)
            .map_err(|source| InferenceError::MalformedImage {
                path: path.to_path_buf(),
                source,
            })?
            .into_rgb8();

        self.predict_image(&image)
    }

    /// Predict the mask channel for an already-decoded image.
    pub fn predict_image(&self, image: &RgbImage) -> Result<PredictedMask, InferenceError> {
        let model = self.model.as_ref().ok_or(InferenceError::ModelNotLoaded)?;

        let input = self
            .transform
            .to_tensor::<B>(image, &self.device)?
            .unsqueeze::<4>();

        let scores = model.forward(input);
        let channel = scores.narrow(1, self.mask_channel, 1);

        let [height, width] = self.transform.target_size;
        let data = channel
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| InferenceError::TensorReadback(format!("{e:?}")))?;

        Ok(PredictedMask {
            data,
            height,
            width,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BackboneConfig, SegmentationModelConfig};
    use crate::training::CheckpointMeta;
    use burn::backend::NdArray;
    use image::Rgb;
    use std::path::PathBuf;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "roadseg-inference-{tag}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn saved_checkpoint(tag: &str) -> PathBuf {
        let device = Default::default();
        let config = SegmentationModelConfig::new(BackboneConfig::new().with_base_channels(2));
        let model = config.init::<NdArray>(&device);
        let meta = CheckpointMeta::new(1, 0.4, 1, 2, [16, 16], config);
        checkpoint::save(&temp_dir(tag), model, &meta).unwrap()
    }

    #[test]
    fn predict_before_restore_fails() {
        let adapter = InferenceAdapter::<NdArray>::new(Default::default());
        let image = RgbImage::from_pixel(16, 16, Rgb([1, 2, 3]));
        assert!(matches!(
            adapter.predict_image(&image),
            Err(InferenceError::ModelNotLoaded)
        ));
    }

    #[test]
    fn predict_is_deterministic_and_shaped_by_checkpoint_meta() {
        let stem = saved_checkpoint("determinism");
        let mut adapter = InferenceAdapter::<NdArray>::new(Default::default());
        adapter.restore(&stem).unwrap();

        let image = RgbImage::from_fn(64, 48, |x, y| Rgb([x as u8, y as u8, 7]));
        let first = adapter.predict_image(&image).unwrap();
        let second = adapter.predict_image(&image).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.height, 16);
        assert_eq!(first.width, 16);
        assert_eq!(first.data.len(), 16 * 16);
    }

    #[test]
    fn restored_and_original_models_agree() {
        let device = Default::default();
        let config = SegmentationModelConfig::new(BackboneConfig::new().with_base_channels(2));
        let model = config.init::<NdArray>(&device);
        let meta = CheckpointMeta::new(3, 0.2, 2, 2, [16, 16], config);

        let image = RgbImage::from_pixel(16, 16, Rgb([100, 50, 25]));
        let transform = SampleTransform::new().with_target_size([16, 16]);
        let input = transform
            .to_tensor::<NdArray>(&image, &device)
            .unwrap()
            .unsqueeze::<4>();
        let direct = model
            .forward(input)
            .narrow(1, 2, 1)
            .into_data()
            .to_vec::<f32>()
            .unwrap();

        let stem = checkpoint::save(&temp_dir("agree"), model, &meta).unwrap();
        let mut adapter = InferenceAdapter::<NdArray>::new(device);
        adapter.restore(&stem).unwrap();
        let predicted = adapter.predict_image(&image).unwrap();

        assert_eq!(predicted.data, direct);
    }
}
