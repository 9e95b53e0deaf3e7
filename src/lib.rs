pub mod error;
pub mod model;

#[cfg(feature = "dataset")]
pub mod dataset;

#[cfg(feature = "training")]
pub mod training;

#[cfg(feature = "training")]
pub mod inference;

pub use model::{SegmentationModel, SegmentationModelConfig};

#[cfg(feature = "dataset")]
pub use dataset::{DatasetGroup, LoaderConfig, PairedDataset, SampleTransform};

#[cfg(feature = "training")]
pub use training::{CheckpointMeta, MetricKind, Trainer, TrainingConfig};

#[cfg(feature = "training")]
pub use inference::InferenceAdapter;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
