mod batcher;
mod loader;
mod paired;
mod transform;

pub use batcher::{PairBatcher, SegmentationBatch};
pub use loader::{LoaderConfig, SplitLoaders, build_split_loaders};
pub use paired::{DatasetGroup, PairedDataset, SamplePair};
pub use transform::SampleTransform;
