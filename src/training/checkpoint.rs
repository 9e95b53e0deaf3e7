use std::path::{Path, PathBuf};

use burn::{prelude::*, record::CompactRecorder};

use crate::error::CheckpointError;
use crate::model::{SegmentationModel, SegmentationModelConfig};

/// Checkpoint metadata persisted next to the weights.
///
/// The mask-channel convention travels with the checkpoint so inference
/// extracts the same semantic channel the ground-truth masks were built
/// from, instead of relying on an assumed convention.
#[derive(Config, Debug)]
pub struct CheckpointMeta {
    #[config(default = "1")]
    pub schema_version: usize,

    /// Number of epochs the run trained for.
    pub epochs: usize,

    /// Best validation loss observed, and the epoch that produced it.
    pub best_loss: f64,
    pub best_epoch: usize,

    /// Output channel holding the semantic mask scores.
    pub mask_channel: usize,

    /// Target resolution the training transform used.
    pub image_size: [usize; 2],

    pub model: SegmentationModelConfig,
}

/// Persist a trained model once, named after the number of epochs trained.
///
/// Writes `{epochs}_epochs_weights.mpk` plus a `.json` metadata file and
/// returns the file stem.
pub fn save<B: Backend>(
    dir: &Path,
    model: SegmentationModel<B>,
    meta: &CheckpointMeta,
) -> Result<PathBuf, CheckpointError> {
    let stem = dir.join(format!("{}_epochs_weights", meta.epochs));

    model
        .save_file(stem.clone(), &CompactRecorder::new())
        .map_err(|e| CheckpointError::Persist {
            path: stem.clone(),
            reason: e.to_string(),
        })?;

    let meta_path = stem.with_extension("json");
    meta.save(&meta_path)
        .map_err(|source| CheckpointError::MetaWrite {
            path: meta_path,
            source,
        })?;

    Ok(stem)
}

/// Restore a checkpoint into a freshly constructed model of the recorded
/// architecture.
pub fn load<B: Backend>(
    stem: &Path,
    device: &B::Device,
) -> Result<(SegmentationModel<B>, CheckpointMeta), CheckpointError> {
    let meta_path = stem.with_extension("json");
    let meta = CheckpointMeta::load(&meta_path).map_err(|e| CheckpointError::MetaRead {
        path: meta_path,
        reason: e.to_string(),
    })?;

    let model = meta
        .model
        .init::<B>(device)
        .load_file(stem.to_path_buf(), &CompactRecorder::new(), device)
        .map_err(|e| CheckpointError::Restore {
            path: stem.to_path_buf(),
            reason: e.to_string(),
        })?;

    Ok((model, meta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BackboneConfig;
    use burn::backend::NdArray;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "roadseg-checkpoint-{tag}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn round_trip_reproduces_predictions() {
        let device = Default::default();
        let config = SegmentationModelConfig::new(BackboneConfig::new().with_base_channels(4));
        let model = config.init::<NdArray>(&device);

        let input = Tensor::<NdArray, 4>::random(
            [1, 3, 16, 16],
            burn::tensor::Distribution::Default,
            &device,
        );
        let before = model.forward(input.clone()).into_data();

        let meta = CheckpointMeta::new(2, 0.5, 1, 2, [16, 16], config);
        let dir = temp_dir("roundtrip");
        let stem = save(&dir, model, &meta).unwrap();

        let (restored, loaded_meta) = load::<NdArray>(&stem, &device).unwrap();
        assert_eq!(loaded_meta.mask_channel, 2);
        assert_eq!(loaded_meta.epochs, 2);

        let after = restored.forward(input).into_data();
        assert_eq!(
            before.to_vec::<f32>().unwrap(),
            after.to_vec::<f32>().unwrap()
        );
    }

    #[test]
    fn restore_from_missing_stem_fails() {
        let device = Default::default();
        let dir = temp_dir("missing");
        let result = load::<NdArray>(&dir.join("nope"), &device);
        assert!(matches!(result, Err(CheckpointError::MetaRead { .. })));
    }
}
