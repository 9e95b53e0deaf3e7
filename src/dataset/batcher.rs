use burn::{data::dataloader::batcher::Batcher, prelude::*};
use derive_new::new;

use super::paired::SamplePair;
use super::transform::SampleTransform;

/// Bundles raw sample pairs into stacked `[N, 3, H, W]` float tensors, the
/// image and its mask put through the same transform.
#[derive(Clone, new)]
pub struct PairBatcher<B: Backend> {
    device: B::Device,
    transform: SampleTransform,
}

#[derive(Clone, Debug)]
pub struct SegmentationBatch<B: Backend> {
    pub images: Tensor<B, 4>,
    pub masks: Tensor<B, 4>,
}

impl<B: Backend> Batcher<SamplePair, SegmentationBatch<B>> for PairBatcher<B> {
    fn batch(&self, items: Vec<SamplePair>) -> SegmentationBatch<B> {
        let mut images = Vec::with_capacity(items.len());
        let mut masks = Vec::with_capacity(items.len());

        for item in items {
            let image_dims = item.image.dimensions();
            let mask_dims = item.mask.dimensions();
            if image_dims != mask_dims {
                panic!(
                    "{}",
                    crate::error::ShapeError::Mismatch {
                        image: [image_dims.0, image_dims.1],
                        mask: [mask_dims.0, mask_dims.1],
                    }
                );
            }

            // A sample the transform rejects aborts the run; skipping it
            // would desynchronize image/mask correspondence.
            let image = self
                .transform
                .to_tensor::<B>(&item.image, &self.device)
                .unwrap_or_else(|e| panic!("failed to transform image: {e}"));
            let mask = self
                .transform
                .to_tensor::<B>(&item.mask, &self.device)
                .unwrap_or_else(|e| panic!("failed to transform mask: {e}"));

            images.push(image);
            masks.push(mask);
        }

        SegmentationBatch {
            images: Tensor::stack::<4>(images, 0),
            masks: Tensor::stack::<4>(masks, 0),
        }
    }
}
