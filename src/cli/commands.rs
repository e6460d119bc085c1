// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `decode` and `init-config`, and
// all their flags.

use clap::{Args, Subcommand, ValueEnum};

use crate::domain::request::{FeatureSource, RecognizeRequest};
use crate::ml::prediction::PredictionKind;

/// The top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a decoder on synthetic encoder features and print the text
    Decode(DecodeArgs),

    /// Write the default decode settings as JSON
    InitConfig(InitConfigArgs),
}

/// Prediction head, as spelled on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecoderChoice {
    Attn,
    Transformer,
    Linear,
    TransformerEncoder,
}

impl From<DecoderChoice> for PredictionKind {
    fn from(c: DecoderChoice) -> Self {
        match c {
            DecoderChoice::Attn               => PredictionKind::Attn,
            DecoderChoice::Transformer        => PredictionKind::Transformer,
            DecoderChoice::Linear             => PredictionKind::Linear,
            DecoderChoice::TransformerEncoder => PredictionKind::TransformerEncoder,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeChoice {
    /// Greedy decoding from [GO]
    Infer,
    /// Teacher-forced decoding on the --text labels
    Train,
}

/// All arguments for the `decode` command
#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Settings JSON written by `init-config`; defaults are used if omitted
    #[arg(long)]
    pub config: Option<String>,

    /// Override the prediction head from the settings
    #[arg(long, value_enum)]
    pub decoder: Option<DecoderChoice>,

    #[arg(long, value_enum, default_value = "infer")]
    pub mode: ModeChoice,

    /// Ground-truth label for one batch row (repeat per row, train mode)
    #[arg(long = "text")]
    pub texts: Vec<String>,

    /// Number of rows in inference mode
    #[arg(long, default_value_t = 1)]
    pub batch: usize,

    /// Length of the synthetic encoder sequence
    #[arg(long, default_value_t = 26)]
    pub encoder_steps: usize,

    /// Seed for the uniform noise features
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Feed all-zero features instead of noise
    #[arg(long)]
    pub zeros: bool,

    /// Pass scene/overlap embeddings even if the head does not need them
    #[arg(long)]
    pub side_context: bool,

    /// Run on the NdArray CPU backend instead of Wgpu
    #[arg(long)]
    pub cpu: bool,
}

impl DecodeArgs {
    /// The per-run request. The application layer never sees clap types.
    pub fn request(&self) -> RecognizeRequest {
        let features = if self.zeros {
            FeatureSource::Zeros
        } else {
            FeatureSource::Noise { seed: self.seed }
        };

        let mut request = match self.mode {
            ModeChoice::Train => RecognizeRequest::train(self.texts.clone(), self.encoder_steps, features),
            ModeChoice::Infer => RecognizeRequest::infer(self.batch, self.encoder_steps, features),
        };
        request.side_context = self.side_context;
        request
    }
}

/// All arguments for the `init-config` command
#[derive(Args, Debug)]
pub struct InitConfigArgs {
    /// Where to write the settings file
    #[arg(default_value = "decode_settings.json")]
    pub path: String,

    /// Prediction head recorded in the file
    #[arg(long, value_enum, default_value = "attn")]
    pub decoder: DecoderChoice,
}
