use std::sync::Arc;

use burn::data::dataloader::{DataLoader, DataLoaderBuilder};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

use super::batcher::{PairBatcher, SegmentationBatch};
use super::paired::PairedDataset;
use super::transform::SampleTransform;

/// Batching configuration shared by both splits. Shuffling applies to the
/// Train split only; the Test split keeps its stable order.
#[derive(Config, Debug)]
pub struct LoaderConfig {
    #[config(default = 4)]
    pub batch_size: usize,

    #[config(default = 4)]
    pub num_workers: usize,

    #[config(default = 42)]
    pub seed: u64,
}

/// One dataloader per split: Train on the autodiff backend, Test on the
/// inner backend so no backward graph is ever built for validation batches.
pub struct SplitLoaders<B: AutodiffBackend> {
    pub train: Arc<dyn DataLoader<SegmentationBatch<B>>>,
    pub test: Arc<dyn DataLoader<SegmentationBatch<B::InnerBackend>>>,
}

/// Build the Train/Test dataloaders over paired datasets.
///
/// Each sample is visited exactly once per full pass; the last batch may be
/// smaller when the dataset size is not divisible by `batch_size`.
pub fn build_split_loaders<B: AutodiffBackend>(
    train: PairedDataset,
    test: PairedDataset,
    transform: SampleTransform,
    config: &LoaderConfig,
    device: &B::Device,
) -> SplitLoaders<B> {
    let batcher_train = PairBatcher::<B>::new(device.clone(), transform.clone());
    let batcher_test = PairBatcher::<B::InnerBackend>::new(device.clone(), transform);

    let mut train_builder = DataLoaderBuilder::new(batcher_train)
        .batch_size(config.batch_size)
        .shuffle(config.seed);
    let mut test_builder = DataLoaderBuilder::new(batcher_test).batch_size(config.batch_size);

    if config.num_workers > 0 {
        train_builder = train_builder.num_workers(config.num_workers);
        test_builder = test_builder.num_workers(config.num_workers);
    }

    let train = train_builder.build(train);
    let test = test_builder.build(test);

    SplitLoaders { train, test }
}
