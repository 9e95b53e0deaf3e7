use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("I/O error while reading `{path}`: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("file does not exist: `{0}`")]
    MissingFile(PathBuf),

    #[error("failed to decode image `{path}`: {source}")]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("invalid file extension: `{0}`")]
    InvalidFileExtension(String),

    #[error("no image/mask pairs found under the configured directories")]
    EmptyDataset,
}

#[derive(Error, Debug)]
pub enum ShapeError {
    #[error("image has a zero dimension ({width}x{height})")]
    ZeroDimension { width: u32, height: u32 },

    #[error("spatial dimensions mismatch: image {image:?} vs mask {mask:?}")]
    Mismatch { image: [u32; 2], mask: [u32; 2] },
}

#[derive(Error, Debug)]
pub enum TrainingError {
    #[error("non-finite loss in {phase} phase (epoch {epoch}, batch {batch})")]
    NonFiniteLoss {
        phase: &'static str,
        epoch: usize,
        batch: usize,
    },

    #[error("failed to read tensor data back from the device: {0}")]
    TensorReadback(String),

    #[error("failed to write the epoch log: {0}")]
    Log(#[from] csv::Error),

    #[error("failed to create the artifact directory `{path}`: {source}")]
    ArtifactDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("failed to persist model weights to `{path}`: {reason}")]
    Persist { path: PathBuf, reason: String },

    #[error("failed to restore model weights from `{path}`: {reason}")]
    Restore { path: PathBuf, reason: String },

    #[error("failed to write checkpoint metadata to `{path}`: {source}")]
    MetaWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read checkpoint metadata from `{path}`: {reason}")]
    MetaRead { path: PathBuf, reason: String },
}

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("no checkpoint restored; call `restore` before `predict`")]
    ModelNotLoaded,

    #[error("malformed input image `{path}`: {source}")]
    MalformedImage {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("requested mask channel {channel} but the model emits {available} channels")]
    InvalidMaskChannel { channel: usize, available: usize },

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error("failed to read prediction data back from the device: {0}")]
    TensorReadback(String),
}
