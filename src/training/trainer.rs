use std::path::PathBuf;

use burn::{
    module::AutodiffModule,
    nn::loss::{MseLoss, Reduction},
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use tracing::{debug, info};

use crate::dataset::SplitLoaders;
use crate::error::TrainingError;
use crate::model::SegmentationModel;

use super::logger::{EpochLogger, LogRecord};
use super::metrics::MetricKind;

/// The two per-epoch passes, run in this order. Only the Train phase
/// computes gradients and updates parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Train,
    Test,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Train => "Train",
            Phase::Test => "Test",
        }
    }
}

#[derive(Config, Debug)]
pub struct TrainingConfig {
    #[config(default = 6)]
    pub num_epochs: usize,

    #[config(default = 1e-5)]
    pub learning_rate: f64,

    pub metrics: Vec<MetricKind>,

    pub artifact_dir: PathBuf,
}

/// Best-so-far snapshot, replaced only on strictly lower validation loss.
/// The snapshot is an owned value; later optimizer steps cannot mutate it.
pub(crate) struct BestCheckpoint<M> {
    pub loss: f64,
    pub epoch: usize,
    pub model: Option<M>,
}

impl<M: Clone> BestCheckpoint<M> {
    pub fn new() -> Self {
        Self {
            loss: f64::INFINITY,
            epoch: 0,
            model: None,
        }
    }

    pub fn observe(&mut self, epoch: usize, loss: f64, model: &M) -> bool {
        if loss < self.loss {
            self.loss = loss;
            self.epoch = epoch;
            self.model = Some(model.clone());
            true
        } else {
            false
        }
    }
}

/// Per-phase accumulator: one loss sequence plus one sequence per configured
/// metric, reset each epoch, reduced by mean at epoch end.
struct PhaseStats {
    losses: Vec<f64>,
    metrics: Vec<Vec<f64>>,
}

impl PhaseStats {
    fn new(num_metrics: usize) -> Self {
        Self {
            losses: Vec::new(),
            metrics: vec![Vec::new(); num_metrics],
        }
    }

    fn record(&mut self, loss: f64, metric_values: Vec<f64>) {
        self.losses.push(loss);
        for (series, value) in self.metrics.iter_mut().zip(metric_values) {
            series.push(value);
        }
    }

    fn mean_loss(&self) -> f64 {
        mean(&self.losses)
    }

    fn mean_metrics(&self) -> Vec<f64> {
        self.metrics.iter().map(|series| mean(series)).collect()
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub struct TrainOutcome<B: AutodiffBackend> {
    /// The model with the best-validation weights restored.
    pub model: SegmentationModel<B>,
    pub best_loss: f64,
    pub best_epoch: usize,
}

pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    /// Run the full train/validation cycle for exactly `num_epochs` epochs
    /// and return the model with the best-validation weights restored. There
    /// is no early stopping and no per-batch retry: any batch failure aborts
    /// the run.
    pub fn fit<B, O>(
        &self,
        mut model: SegmentationModel<B>,
        mut optimizer: O,
        loaders: &SplitLoaders<B>,
    ) -> Result<TrainOutcome<B>, TrainingError>
    where
        B: AutodiffBackend,
        O: Optimizer<SegmentationModel<B>, B>,
    {
        std::fs::create_dir_all(&self.config.artifact_dir).map_err(|source| {
            TrainingError::ArtifactDir {
                path: self.config.artifact_dir.clone(),
                source,
            }
        })?;
        let logger = EpochLogger::create(
            &self.config.artifact_dir.join("logs.csv"),
            &self.config.metrics,
        )?;

        let criterion = MseLoss::new();
        let mut best = BestCheckpoint::new();

        for epoch in 1..=self.config.num_epochs {
            let mut train_stats = PhaseStats::new(self.config.metrics.len());
            let mut test_stats = PhaseStats::new(self.config.metrics.len());

            debug!(epoch, phase = Phase::Train.as_str(), "starting phase");
            for (batch, item) in loaders.train.iter().enumerate() {
                let output = model.forward(item.images);
                let loss = criterion.forward(output.clone(), item.masks.clone(), Reduction::Mean);

                let loss_value = loss.clone().into_scalar().elem::<f64>();
                if !loss_value.is_finite() {
                    return Err(TrainingError::NonFiniteLoss {
                        phase: Phase::Train.as_str(),
                        epoch,
                        batch,
                    });
                }

                let metric_values = self.metric_values(output, item.masks)?;
                train_stats.record(loss_value, metric_values);

                let grads = GradientsParams::from_grads(loss.backward(), &model);
                model = optimizer.step(self.config.learning_rate, model, grads);
            }

            // The Test phase runs on the inner backend: no backward graph is
            // retained and no parameter can be updated.
            debug!(epoch, phase = Phase::Test.as_str(), "starting phase");
            let model_eval = model.valid();
            for (batch, item) in loaders.test.iter().enumerate() {
                let output = model_eval.forward(item.images);
                let loss = criterion.forward(output.clone(), item.masks.clone(), Reduction::Mean);

                let loss_value = loss.into_scalar().elem::<f64>();
                if !loss_value.is_finite() {
                    return Err(TrainingError::NonFiniteLoss {
                        phase: Phase::Test.as_str(),
                        epoch,
                        batch,
                    });
                }

                let metric_values = self.metric_values(output, item.masks)?;
                test_stats.record(loss_value, metric_values);
            }

            let record = LogRecord {
                epoch,
                train_loss: train_stats.mean_loss(),
                test_loss: test_stats.mean_loss(),
                train_metrics: train_stats.mean_metrics(),
                test_metrics: test_stats.mean_metrics(),
            };
            logger.append(&record)?;
            info!(
                epoch,
                train_loss = record.train_loss,
                test_loss = record.test_loss,
                "epoch complete"
            );

            if best.observe(epoch, record.test_loss, &model) {
                debug!(epoch, loss = record.test_loss, "new best checkpoint");
            }
        }

        // Restore the best-validation weights before returning.
        let model = best.model.unwrap_or(model);

        Ok(TrainOutcome {
            model,
            best_loss: best.loss,
            best_epoch: best.epoch,
        })
    }

    fn metric_values<B: Backend>(
        &self,
        output: Tensor<B, 4>,
        targets: Tensor<B, 4>,
    ) -> Result<Vec<f64>, TrainingError> {
        if self.config.metrics.is_empty() {
            return Ok(Vec::new());
        }

        let predictions = output
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| TrainingError::TensorReadback(format!("{e:?}")))?;
        let truth = targets
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| TrainingError::TensorReadback(format!("{e:?}")))?;

        Ok(self
            .config
            .metrics
            .iter()
            .map(|metric| metric.compute(&truth, &predictions))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{
        DatasetGroup, LoaderConfig, PairedDataset, SampleTransform, build_split_loaders,
    };
    use crate::model::{BackboneConfig, SegmentationModelConfig};
    use burn::backend::{Autodiff, NdArray};
    use burn::optim::AdamConfig;
    use image::{Rgb, RgbImage};
    use std::path::Path;

    #[test]
    fn best_checkpoint_keeps_strictly_lowest_loss() {
        let mut best = BestCheckpoint::new();

        assert!(best.observe(1, 0.8, &"epoch-1"));
        assert!(best.observe(2, 0.5, &"epoch-2"));
        assert!(!best.observe(3, 0.6, &"epoch-3"));

        assert_eq!(best.epoch, 2);
        assert_eq!(best.loss, 0.5);
        assert_eq!(best.model, Some("epoch-2"));
    }

    #[test]
    fn equal_loss_does_not_replace_best() {
        let mut best = BestCheckpoint::new();
        best.observe(1, 0.5, &1u32);
        assert!(!best.observe(2, 0.5, &2u32));
        assert_eq!(best.epoch, 1);
    }

    fn synthetic_dataset(tag: &str, count: usize) -> PairedDataset {
        let root = std::env::temp_dir().join(format!(
            "roadseg-trainer-{tag}-{}",
            std::process::id()
        ));
        let images = root.join("CameraRGB");
        let masks = root.join("CameraSeg");
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(&images).unwrap();
        std::fs::create_dir_all(&masks).unwrap();

        for i in 0..count {
            let name = format!("{i}.png");
            RgbImage::from_fn(16, 16, |x, y| Rgb([(x * 16) as u8, (y * 16) as u8, i as u8]))
                .save(images.join(&name))
                .unwrap();
            RgbImage::from_pixel(16, 16, Rgb([0, 0, if i % 2 == 0 { 200 } else { 0 }]))
                .save(masks.join(&name))
                .unwrap();
        }

        PairedDataset::new([DatasetGroup::new(
            Path::new(&images).to_path_buf(),
            Path::new(&masks).to_path_buf(),
        )])
        .unwrap()
    }

    #[test]
    fn fit_writes_one_log_row_per_epoch_and_returns_finite_best() {
        type B = Autodiff<NdArray>;
        let device = Default::default();

        let train = synthetic_dataset("train", 4);
        let test = synthetic_dataset("test", 2);

        let transform = SampleTransform::new().with_target_size([16, 16]);
        let loader_config = LoaderConfig::new().with_batch_size(2).with_num_workers(0);
        let loaders = build_split_loaders::<B>(train, test, transform, &loader_config, &device);

        let model = SegmentationModelConfig::new(BackboneConfig::new().with_base_channels(2))
            .init::<B>(&device);
        let optimizer = AdamConfig::new().init();

        let artifact_dir = std::env::temp_dir().join(format!(
            "roadseg-trainer-artifacts-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&artifact_dir);

        let config = TrainingConfig::new(
            vec![MetricKind::F1 { threshold: 0.1 }, MetricKind::MeanAbsoluteError],
            artifact_dir.clone(),
        )
        .with_num_epochs(2)
        .with_learning_rate(1e-3);

        let outcome = Trainer::new(config).fit(model, optimizer, &loaders).unwrap();

        assert!(outcome.best_loss.is_finite());
        assert!((1..=2).contains(&outcome.best_epoch));

        let log = std::fs::read_to_string(artifact_dir.join("logs.csv")).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "Epoch,Train Loss,Test Loss,Train_f1,Test_f1,Train_mae,Test_mae"
        );
    }
}
