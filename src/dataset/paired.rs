use std::path::{Path, PathBuf};

use burn::data::dataset::Dataset;
use derive_new::new;
use image::RgbImage;

use crate::error::DatasetError;

const SUPPORTED_FILES: [&str; 4] = ["bmp", "jpg", "jpeg", "png"];

/// One capture session: a directory of RGB frames and a directory of
/// segmentation masks sharing the same basenames.
#[derive(Debug, Clone)]
pub struct DatasetGroup {
    pub image_dir: PathBuf,
    pub mask_dir: PathBuf,
}

impl DatasetGroup {
    pub fn new<P: AsRef<Path>>(image_dir: P, mask_dir: P) -> Self {
        Self {
            image_dir: image_dir.as_ref().to_path_buf(),
            mask_dir: mask_dir.as_ref().to_path_buf(),
        }
    }
}

/// A raw sample: decoded RGB frame and its decoded segmentation mask.
#[derive(Debug, Clone, new)]
pub struct SamplePair {
    pub image: RgbImage,
    pub mask: RgbImage,
}

#[derive(Debug, Clone)]
struct PairedItemRaw {
    image_path: PathBuf,
    mask_path: PathBuf,
}

/// Indexes matching (image, mask) file pairs across one or more directory
/// groups and loads them from disk by index.
///
/// The index is built by enumerating the image directory of each group and
/// joining mask paths on the shared filename. Iteration order is stable once
/// constructed (filenames are sorted within each group).
pub struct PairedDataset {
    items: Vec<PairedItemRaw>,
}

impl PairedDataset {
    /// Build the pair index from a sequence of directory groups.
    ///
    /// Fails with [`DatasetError::EmptyDataset`] when no pair is discovered.
    pub fn new<I>(groups: I) -> Result<Self, DatasetError>
    where
        I: IntoIterator<Item = DatasetGroup>,
    {
        let mut items = Vec::new();

        for group in groups {
            let mut names = Vec::new();

            let entries =
                std::fs::read_dir(&group.image_dir).map_err(|source| DatasetError::Io {
                    path: group.image_dir.clone(),
                    source,
                })?;

            for entry in entries {
                let entry = entry.map_err(|source| DatasetError::Io {
                    path: group.image_dir.clone(),
                    source,
                })?;
                let path = entry.path();

                if !path.is_file() {
                    continue;
                }

                let extension = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .unwrap_or("")
                    .to_string();
                Self::check_extension(&extension)?;

                if let Some(name) = path.file_name() {
                    names.push(name.to_os_string());
                }
            }

            names.sort();

            for name in names {
                items.push(PairedItemRaw {
                    image_path: group.image_dir.join(&name),
                    mask_path: group.mask_dir.join(&name),
                });
            }
        }

        if items.is_empty() {
            return Err(DatasetError::EmptyDataset);
        }

        Ok(Self { items })
    }

    /// Convenience constructor for a single (image_dir, mask_dir) pair.
    pub fn from_dirs<P: AsRef<Path>>(image_dir: P, mask_dir: P) -> Result<Self, DatasetError> {
        Self::new([DatasetGroup::new(image_dir, mask_dir)])
    }

    pub fn length(&self) -> usize {
        self.items.len()
    }

    /// Load the raw pair at `index` from disk.
    ///
    /// Fails with [`DatasetError::MissingFile`] when either indexed path no
    /// longer exists at access time.
    pub fn load(&self, index: usize) -> Result<SamplePair, DatasetError> {
        let item = self
            .items
            .get(index)
            .ok_or_else(|| DatasetError::MissingFile(PathBuf::from(format!("index {index}"))))?;

        let image = Self::decode(&item.image_path)?;
        let mask = Self::decode(&item.mask_path)?;

        Ok(SamplePair { image, mask })
    }

    fn decode(path: &Path) -> Result<RgbImage, DatasetError> {
        if !path.exists() {
            return Err(DatasetError::MissingFile(path.to_path_buf()));
        }

        let image = image::open(path).map_err(|source| DatasetError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(image.into_rgb8())
    }

    fn check_extension(extension: &str) -> Result<(), DatasetError> {
        if SUPPORTED_FILES
            .iter()
            .any(|&valid| valid.eq_ignore_ascii_case(extension))
        {
            Ok(())
        } else {
            Err(DatasetError::InvalidFileExtension(extension.to_string()))
        }
    }
}

impl Dataset<SamplePair> for PairedDataset {
    fn get(&self, index: usize) -> Option<SamplePair> {
        if index >= self.items.len() {
            return None;
        }

        // A corrupt or missing sample aborts the run: skipping it would
        // desynchronize image/mask correspondence.
        match self.load(index) {
            Ok(pair) => Some(pair),
            Err(e) => panic!("failed to load sample pair {index}: {e}"),
        }
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}
