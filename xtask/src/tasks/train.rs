use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use burn::{
    backend::{Autodiff, Wgpu, wgpu::WgpuDevice},
    optim::AdamConfig,
    prelude::*,
};

use roadseg::{
    CheckpointMeta, DatasetGroup, LoaderConfig, MetricKind, PairedDataset, SampleTransform,
    SegmentationModelConfig, Trainer, TrainingConfig,
    dataset::build_split_loaders,
    model::BackboneConfig,
    training::checkpoint,
};

#[derive(Args)]
pub struct TrainArgs {
    /// Root directory holding one subdirectory per capture session.
    #[arg(short, long)]
    pub data_dir: PathBuf,

    /// Capture-session groups, in order; the last one is held out as the
    /// Test split.
    #[arg(long, value_delimiter = ',', default_value = "dataA,dataB,dataC,dataD,dataE")]
    pub groups: Vec<String>,

    #[arg(long, default_value = "CameraRGB")]
    pub image_subdir: String,

    #[arg(long, default_value = "CameraSeg")]
    pub mask_subdir: String,

    #[arg(short, long, default_value_t = 6)]
    pub epochs: usize,

    #[arg(short, long, default_value_t = 4)]
    pub batch_size: usize,

    #[arg(short, long, default_value_t = 1e-5)]
    pub lr: f64,

    #[arg(long, default_value_t = 4)]
    pub num_workers: usize,

    #[arg(long, default_value_t = 256)]
    pub image_size: usize,

    #[arg(long, default_value_t = 3)]
    pub output_channels: usize,

    /// Output channel holding the semantic mask scores, matching the channel
    /// the ground-truth masks encode.
    #[arg(long, default_value_t = 2)]
    pub mask_channel: usize,

    #[arg(long, default_value_t = 32)]
    pub base_channels: usize,

    #[arg(long, default_value_t = 0.1)]
    pub f1_threshold: f32,

    /// Record file with pretrained backbone weights to fine-tune from.
    #[arg(long)]
    pub backbone_weights: Option<PathBuf>,

    #[arg(short, long, default_value = "artifacts")]
    pub artifact_dir: PathBuf,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

pub fn run(args: &TrainArgs) -> Result<()> {
    type MyBackend = Wgpu<f32, i32>;
    type MyAutodiffBackend = Autodiff<MyBackend>;

    if args.groups.len() < 2 {
        return Err(anyhow::anyhow!(
            "need at least two groups: all but the last train, the last is held out"
        ));
    }

    std::fs::create_dir_all(&args.artifact_dir)?;

    println!("Initializing device...");
    let device = WgpuDevice::default();

    MyAutodiffBackend::seed(args.seed);

    let group_dirs: Vec<DatasetGroup> = args
        .groups
        .iter()
        .map(|group| {
            let root = args.data_dir.join(group);
            DatasetGroup::new(root.join(&args.image_subdir), root.join(&args.mask_subdir))
        })
        .collect();

    let (held_out, training_groups) = group_dirs
        .split_last()
        .expect("at least two groups checked above");

    println!("Loading datasets...");
    let train_dataset = PairedDataset::new(training_groups.to_vec())?;
    println!("Loaded {} pairs (training split)", train_dataset.length());

    let test_dataset = PairedDataset::new([held_out.clone()])?;
    println!("Loaded {} pairs (held-out split)", test_dataset.length());

    let transform = SampleTransform::new().with_target_size([args.image_size, args.image_size]);
    let loader_config = LoaderConfig::new()
        .with_batch_size(args.batch_size)
        .with_num_workers(args.num_workers)
        .with_seed(args.seed);

    println!(
        "Building dataloaders with batch size {}...",
        args.batch_size
    );
    let loaders = build_split_loaders::<MyAutodiffBackend>(
        train_dataset,
        test_dataset,
        transform,
        &loader_config,
        &device,
    );

    println!(
        "Creating segmentation model with {} base channels...",
        args.base_channels
    );
    let model_config = SegmentationModelConfig::new(
        BackboneConfig::new().with_base_channels(args.base_channels),
    )
    .with_output_channels(args.output_channels);
    let mut model = model_config.init::<MyAutodiffBackend>(&device);

    if let Some(weights) = &args.backbone_weights {
        println!("Loading pretrained backbone from {}...", weights.display());
        model = model.with_pretrained_backbone(weights, &device)?;
    }

    println!("Initializing Adam optimizer with learning rate {}...", args.lr);
    let optimizer = AdamConfig::new().init();

    let training_config = TrainingConfig::new(
        vec![
            MetricKind::F1 {
                threshold: args.f1_threshold,
            },
            MetricKind::MeanAbsoluteError,
        ],
        args.artifact_dir.clone(),
    )
    .with_num_epochs(args.epochs)
    .with_learning_rate(args.lr);

    println!("Training for {} epochs...", args.epochs);
    let outcome = Trainer::new(training_config).fit(model, optimizer, &loaders)?;

    println!(
        "Lowest test loss {:.6} at epoch {}",
        outcome.best_loss, outcome.best_epoch
    );

    let meta = CheckpointMeta::new(
        args.epochs,
        outcome.best_loss,
        outcome.best_epoch,
        args.mask_channel,
        [args.image_size, args.image_size],
        model_config,
    );

    // A failed write is reported but the best weights stay usable in memory;
    // the run itself still succeeded.
    match checkpoint::save(&args.artifact_dir, outcome.model, &meta) {
        Ok(stem) => println!("Saved checkpoint to {}", stem.display()),
        Err(e) => eprintln!("Warning: failed to persist checkpoint: {e}"),
    }

    println!("Training completed successfully!");
    Ok(())
}
