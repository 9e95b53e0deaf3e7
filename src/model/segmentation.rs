use std::path::Path;

use burn::{
    nn::conv::{Conv2d, Conv2dConfig},
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use super::backbone::{Backbone, BackboneConfig};
use crate::error::CheckpointError;

/// Segmentation network: an opaque feature-extraction backbone with a 1x1
/// convolution head emitting one raw score map per output channel.
///
/// Train/eval behavior (dropout, batch statistics) follows the backend: run
/// on an autodiff backend to train, take [`burn::module::AutodiffModule::valid`]
/// for the gradient-free evaluation copy.
#[derive(Module, Debug)]
pub struct SegmentationModel<B: Backend> {
    backbone: Backbone<B>,
    head: Conv2d<B>,
}

#[derive(Config, Debug)]
pub struct SegmentationModelConfig {
    /// Number of score maps emitted by the head.
    #[config(default = "3")]
    pub output_channels: usize,

    pub backbone: BackboneConfig,
}

impl Default for SegmentationModelConfig {
    fn default() -> Self {
        Self::new(BackboneConfig::new())
    }
}

impl SegmentationModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SegmentationModel<B> {
        SegmentationModel {
            backbone: self.backbone.init(device),
            head: Conv2dConfig::new(
                [self.backbone.feature_channels(), self.output_channels],
                [1, 1],
            )
            .init(device),
        }
    }
}

impl<B: Backend> SegmentationModel<B> {
    /// `[N, 3, H, W]` image batch -> `[N, output_channels, H, W]` raw scores.
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        let features = self.backbone.forward(images);

        self.head.forward(features)
    }

    /// Replace the backbone weights with a pretrained record, keeping the
    /// freshly initialized head.
    pub fn with_pretrained_backbone(
        mut self,
        path: &Path,
        device: &B::Device,
    ) -> Result<Self, CheckpointError> {
        let record = CompactRecorder::new()
            .load(path.to_path_buf(), device)
            .map_err(|e| CheckpointError::Restore {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        self.backbone = self.backbone.load_record(record);

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn forward_emits_configured_channels_at_input_resolution() {
        let device = Default::default();
        let model = SegmentationModelConfig::new(BackboneConfig::new().with_base_channels(4))
            .with_output_channels(3)
            .init::<NdArray>(&device);

        let images = Tensor::zeros([2, 3, 16, 16], &device);
        let scores = model.forward(images);

        assert_eq!(scores.dims(), [2, 3, 16, 16]);
    }
}
