use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use burn::backend::{Wgpu, wgpu::WgpuDevice};

use roadseg::InferenceAdapter;

#[derive(Args)]
pub struct PredictArgs {
    /// Checkpoint file stem, e.g. `artifacts/6_epochs_weights`.
    #[arg(short, long)]
    pub checkpoint: PathBuf,

    /// Input RGB image.
    #[arg(short, long)]
    pub image: PathBuf,

    /// Where to write the predicted mask channel as an 8-bit PNG.
    #[arg(short, long, default_value = "mask.png")]
    pub output: PathBuf,
}

pub fn run(args: &PredictArgs) -> Result<()> {
    type MyBackend = Wgpu<f32, i32>;

    println!("Initializing device...");
    let device = WgpuDevice::default();

    println!("Restoring checkpoint {}...", args.checkpoint.display());
    let mut adapter = InferenceAdapter::<MyBackend>::new(device);
    adapter.restore(&args.checkpoint)?;

    println!("Predicting mask for {}...", args.image.display());
    let mask = adapter.predict(&args.image)?;

    let output = image::GrayImage::from_fn(mask.width as u32, mask.height as u32, |x, y| {
        let value = mask.data[y as usize * mask.width + x as usize];
        image::Luma([(value.clamp(0.0, 1.0) * 255.0).round() as u8])
    });
    output.save(&args.output)?;

    println!("Wrote predicted mask to {}", args.output.display());
    Ok(())
}
