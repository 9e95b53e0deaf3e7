mod backbone;
mod blocks;
mod segmentation;

pub use backbone::{Backbone, BackboneConfig};
pub use blocks::{
    ConvBlock, ConvBlockConfig, DecoderBlock, DecoderBlockConfig, EncoderBlock, EncoderBlockConfig,
};
pub use segmentation::{SegmentationModel, SegmentationModelConfig};
