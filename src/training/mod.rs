pub mod checkpoint;
pub mod logger;
pub mod metrics;
pub mod trainer;

pub use checkpoint::CheckpointMeta;
pub use logger::{EpochLogger, LogRecord};
pub use metrics::MetricKind;
pub use trainer::{Phase, TrainOutcome, Trainer, TrainingConfig};
