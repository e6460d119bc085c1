// ============================================================
// Layer 2 — RecognizeUseCase
// ============================================================
// Runs one decoding pass end to end:
//
//   Step 1: Build the label converter       (Layer 3 - domain)
//   Step 2: Build the prediction head       (Layer 5 - ml)
//   Step 3: Make stand-in encoder features  (this layer)
//   Step 4: Encode labels for training mode (Layer 3 - domain)
//   Step 5: Decode and read out             (Layer 5 - ml)
//   Step 6: Turn choices into text          (Layer 3 - domain)
//
// The use case is generic over the burn backend; the CLI picks
// Wgpu or NdArray.

use anyhow::{bail, Context, Result};
use burn::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::domain::{
    label_converter::{default_character_set, LabelConverter, GO_INDEX},
    recognition::Recognition,
    request::{FeatureSource, RecognizeRequest},
    traits::TextRecognizer,
};
use crate::ml::{
    attention_decoder::AttentionDecoderConfig,
    decoder::{DecoderInput, SequenceDecoder, SideContext},
    linear_decoder::LinearDecoderConfig,
    prediction::{read_out, PredictionKind, Predictor, TransformerEncoderPredictionConfig},
    side_context::SemanticInitConfig,
    tf_decoder::TransformerCharDecoderConfig,
};

// ─── Decode Settings ─────────────────────────────────────────────────────────
// Architecture and vocabulary for a recognizer. Saved as JSON so a
// run can be reproduced with the same decoder shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodeSettings {
    pub decoder:            PredictionKind,
    pub character_set:      String,
    pub max_length:         usize,
    /// Channels of the encoder output
    pub input_size:         usize,
    pub hidden_size:        usize,
    pub embed_dim:          usize,
    pub num_heads:          usize,
    pub num_layers:         usize,
    pub d_ff:               usize,
    pub dropout:            f64,
    /// Third attention block over the overlap embedding (transformer only)
    pub semantic_attention: bool,
    /// Seed the recurrent state from scene/overlap embeddings (attn only)
    pub side_init:          bool,
    pub scene_dim:          usize,
    pub overlap_dim:        usize,
}

impl Default for DecodeSettings {
    fn default() -> Self {
        Self {
            decoder:            PredictionKind::Attn,
            character_set:      default_character_set(),
            max_length:         25,
            input_size:         256,
            hidden_size:        256,
            embed_dim:          256,
            num_heads:          8,
            num_layers:         6,
            d_ff:               2048,
            dropout:            0.1,
            semantic_attention: false,
            side_init:          false,
            scene_dim:          1065,
            overlap_dim:        972,
        }
    }
}

/// Build the configured prediction head on `device`.
pub fn build_predictor<B: Backend>(
    settings:    &DecodeSettings,
    num_classes: usize,
    device:      &B::Device,
) -> Result<Predictor<B>> {
    let predictor = match settings.decoder {
        PredictionKind::Attn => {
            let side_init = settings.side_init.then(|| {
                SemanticInitConfig::new(settings.hidden_size)
                    .with_scene_dim(settings.scene_dim)
                    .with_overlap_dim(settings.overlap_dim)
            });
            let decoder = AttentionDecoderConfig::new(settings.input_size, settings.hidden_size, num_classes)
                .with_max_length(settings.max_length)
                .with_go_index(GO_INDEX)
                .with_side_init(side_init)
                .init(device)?;
            Predictor::Attention(decoder)
        }
        PredictionKind::Transformer => {
            let decoder = TransformerCharDecoderConfig::new(settings.input_size, num_classes, settings.embed_dim)
                .with_max_length(settings.max_length)
                .with_go_index(GO_INDEX)
                .with_n_heads(settings.num_heads)
                .with_d_ff(settings.d_ff)
                .with_num_layers(settings.num_layers)
                .with_dropout(settings.dropout)
                .with_semantic_attention(settings.semantic_attention)
                .with_semantic_dim(settings.overlap_dim)
                .init(device)?;
            Predictor::Transformer(decoder)
        }
        PredictionKind::Linear => {
            let decoder = LinearDecoderConfig::new(num_classes)
                .with_input_size(settings.input_size)
                .init(device);
            Predictor::Linear(decoder)
        }
        PredictionKind::TransformerEncoder => {
            // init never yields a module, so this arm only propagates its error
            let never = TransformerEncoderPredictionConfig::new(num_classes, settings.input_size)
                .init::<B>(device)?;
            match never {}
        }
    };

    tracing::debug!("Built {:?} prediction head ({} classes)", predictor.kind(), num_classes);
    Ok(predictor)
}

/// `rows * cols` values from the requested source.
fn synthetic_values(rows: usize, cols: usize, source: FeatureSource, stream: u64) -> Vec<f32> {
    match source {
        FeatureSource::Zeros => vec![0.0; rows * cols],
        FeatureSource::Noise { seed } => {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(stream));
            (0..rows * cols).map(|_| rng.gen_range(-1.0f32..1.0)).collect()
        }
    }
}

// ─── RecognizeUseCase ─────────────────────────────────────────────────────────
pub struct RecognizeUseCase<B: Backend> {
    settings:  DecodeSettings,
    converter: LabelConverter,
    predictor: Predictor<B>,
    device:    B::Device,
}

impl<B: Backend> RecognizeUseCase<B> {
    pub fn new(settings: DecodeSettings, device: B::Device) -> Result<Self> {
        let converter = LabelConverter::new(&settings.character_set)
            .context("Invalid character set in decode settings")?;
        let predictor = build_predictor::<B>(&settings, converter.num_classes(), &device)
            .with_context(|| format!("Cannot build the {:?} decoder", settings.decoder))?;

        Ok(Self { settings, converter, predictor, device })
    }

    fn encoder_output(&self, request: &RecognizeRequest) -> Tensor<B, 3> {
        let [b, t, c] = [request.batch_size, request.encoder_steps, self.settings.input_size];
        let values    = synthetic_values(b, t * c, request.features, 0);
        Tensor::<B, 1>::from_floats(values.as_slice(), &self.device).reshape([b, t, c])
    }

    fn side_context(&self, batch: usize, source: FeatureSource) -> SideContext<B> {
        let scene_dim   = self.settings.scene_dim;
        let overlap_dim = self.settings.overlap_dim;

        let scene   = synthetic_values(batch, scene_dim, source, 1);
        let overlap = synthetic_values(batch, overlap_dim, source, 2);
        SideContext {
            scene:   Tensor::<B, 1>::from_floats(scene.as_slice(), &self.device).reshape([batch, scene_dim]),
            overlap: Tensor::<B, 1>::from_floats(overlap.as_slice(), &self.device).reshape([batch, overlap_dim]),
        }
    }

    fn targets(&self, labels: &[String]) -> Result<Tensor<B, 2, Int>> {
        let refs: Vec<&str> = labels.iter().map(String::as_str).collect();
        let rows = self
            .converter
            .encode(&refs, self.settings.max_length)
            .context("Cannot encode training labels")?;

        let width = self.settings.max_length + 2;
        let flat: Vec<i64> = rows.into_iter().flatten().collect();
        Ok(Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device).reshape([labels.len(), width]))
    }

    pub fn execute(&self, request: &RecognizeRequest) -> Result<Vec<Recognition>> {
        if request.batch_size == 0 {
            bail!("Batch size must be at least 1");
        }
        if request.encoder_steps == 0 {
            bail!("Encoder output needs at least one step");
        }

        let features = self.encoder_output(request);
        let mut input = if request.mode.is_train() {
            if request.labels.len() != request.batch_size {
                bail!(
                    "Training mode needs one label per batch row: got {} labels for {} rows",
                    request.labels.len(),
                    request.batch_size
                );
            }
            DecoderInput::train(features, self.targets(&request.labels)?)
        } else {
            DecoderInput::infer(features)
        };

        if request.side_context || self.predictor.consumes_side_context() {
            input = input.with_side(self.side_context(request.batch_size, request.features));
        }

        tracing::info!(
            "Decoding {} rows with {:?} in {:?} mode ({} output steps)",
            request.batch_size,
            self.predictor.kind(),
            request.mode,
            self.predictor.output_steps(request.encoder_steps),
        );

        let scores  = self.predictor.decode(input).context("Decoding failed")?;
        let choices = read_out(scores)?;

        for (row, steps) in choices.iter().enumerate() {
            tracing::trace!(
                "row {row} steps: {}",
                steps.iter().map(|s| self.converter.token(s.index)).collect::<Vec<_>>().join(" "),
            );
        }

        let results = choices
            .iter()
            .map(|steps| Recognition::from_steps(&self.converter, steps))
            .collect::<Result<Vec<_>, _>>()
            .context("Decoder produced an index outside the character set")?;

        for (row, r) in results.iter().enumerate() {
            tracing::debug!("row {row}: {:?} (confidence {:.4})", r.text, r.confidence);
        }
        Ok(results)
    }
}

impl<B: Backend> TextRecognizer for RecognizeUseCase<B> {
    fn recognize(&self, request: &RecognizeRequest) -> Result<Vec<Recognition>> {
        self.execute(request)
    }
}
