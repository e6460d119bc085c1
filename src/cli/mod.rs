// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All work is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `decode`      — run a decoder and print the recognized text
//   2. `init-config` — write default decode settings to disk

pub mod commands;

use anyhow::Result;
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, NdArray, Wgpu},
    prelude::Backend,
};
use clap::Parser;
use commands::{Commands, DecodeArgs, InitConfigArgs};

use crate::application::recognize_use_case::{DecodeSettings, RecognizeUseCase};
use crate::domain::traits::{Persistable, TextRecognizer};

#[derive(Parser, Debug)]
#[command(
    name = "scene-text-decoder",
    version = "0.1.0",
    about = "Character decoders for scene-text recognition: attention, transformer and linear heads."
)]
pub struct Cli {
    /// The subcommand to run (decode or init-config)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch. The CLI only routes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Decode(args)     => run_decode(args),
            Commands::InitConfig(args) => run_init_config(args),
        }
    }
}

fn run_decode(args: DecodeArgs) -> Result<()> {
    let mut settings = match &args.config {
        Some(path) => DecodeSettings::load(path)?,
        None       => DecodeSettings::default(),
    };
    if let Some(choice) = args.decoder {
        settings.decoder = choice.into();
    }

    if args.cpu {
        decode_on::<NdArray>(settings, &args, NdArrayDevice::Cpu)
    } else {
        decode_on::<Wgpu>(settings, &args, WgpuDevice::default())
    }
}

fn decode_on<B: Backend>(settings: DecodeSettings, args: &DecodeArgs, device: B::Device) -> Result<()> {
    let request  = args.request();
    let use_case = RecognizeUseCase::<B>::new(settings, device)?;
    let results  = use_case.recognize(&request)?;

    for (row, r) in results.iter().enumerate() {
        match request.labels.get(row) {
            Some(label) => println!("[{row}] {:<27} confidence {:.4}  (label {label:?})", format!("{:?}", r.text), r.confidence),
            None        => println!("[{row}] {:<27} confidence {:.4}", format!("{:?}", r.text), r.confidence),
        }
    }
    Ok(())
}

fn run_init_config(args: InitConfigArgs) -> Result<()> {
    let settings = DecodeSettings {
        decoder: args.decoder.into(),
        ..DecodeSettings::default()
    };
    settings.save(&args.path)?;

    tracing::info!("Wrote default {:?} settings", settings.decoder);
    println!("Settings written to {}", args.path);
    Ok(())
}
