use burn::prelude::*;

use super::blocks::{
    ConvBlock, ConvBlockConfig, DecoderBlock, DecoderBlockConfig, EncoderBlock, EncoderBlockConfig,
};

/// Encoder-decoder feature extractor. The training and inference code treats
/// it as an opaque function from an image batch to a feature map at the input
/// resolution; its weights may be initialized from a pretrained record.
#[derive(Module, Debug)]
pub struct Backbone<B: Backend> {
    encoder_block_1: EncoderBlock<B>,
    encoder_block_2: EncoderBlock<B>,
    encoder_block_3: EncoderBlock<B>,
    bottleneck: ConvBlock<B>,
    decoder_block_1: DecoderBlock<B>,
    decoder_block_2: DecoderBlock<B>,
    decoder_block_3: DecoderBlock<B>,
}

#[derive(Config, Debug)]
pub struct BackboneConfig {
    #[config(default = "3")]
    pub input_channels: usize,

    #[config(default = "32")]
    pub base_channels: usize,

    #[config(default = "0.2")]
    pub dropout: f64,
}

impl BackboneConfig {
    /// Number of channels in the emitted feature map.
    pub fn feature_channels(&self) -> usize {
        self.base_channels
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Backbone<B> {
        let c = self.base_channels;

        Backbone {
            encoder_block_1: EncoderBlockConfig::new(
                ConvBlockConfig::new(self.input_channels, c).with_dropout(self.dropout),
            )
            .init(device),
            encoder_block_2: EncoderBlockConfig::new(
                ConvBlockConfig::new(c, c * 2).with_dropout(self.dropout),
            )
            .init(device),
            encoder_block_3: EncoderBlockConfig::new(
                ConvBlockConfig::new(c * 2, c * 4).with_dropout(self.dropout),
            )
            .init(device),
            bottleneck: ConvBlockConfig::new(c * 4, c * 8)
                .with_dropout(self.dropout)
                .init(device),
            decoder_block_1: DecoderBlockConfig::new(
                c * 8,
                c * 4,
                ConvBlockConfig::new(c * 8, c * 4).with_dropout(self.dropout),
            )
            .init(device),
            decoder_block_2: DecoderBlockConfig::new(
                c * 4,
                c * 2,
                ConvBlockConfig::new(c * 4, c * 2).with_dropout(self.dropout),
            )
            .init(device),
            decoder_block_3: DecoderBlockConfig::new(
                c * 2,
                c,
                ConvBlockConfig::new(c * 2, c).with_dropout(self.dropout),
            )
            .init(device),
        }
    }
}

impl<B: Backend> Backbone<B> {
    /// `[N, input_channels, H, W]` -> `[N, base_channels, H, W]`.
    ///
    /// Spatial dimensions must be divisible by 8 (three pooling stages).
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        let (x, skip_1) = self.encoder_block_1.forward(images);
        let (x, skip_2) = self.encoder_block_2.forward(x);
        let (x, skip_3) = self.encoder_block_3.forward(x);

        let x = self.bottleneck.forward(x);

        let x = self.decoder_block_1.forward(x, skip_3);
        let x = self.decoder_block_2.forward(x, skip_2);

        self.decoder_block_3.forward(x, skip_1)
    }
}
