// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Subcommands: `train`, `generate`, `retrieve`, `lookup`.

use clap::{ArgGroup, Args, Subcommand};

use crate::application::train_use_case::TrainConfig;
use crate::baselines::lookup::DEFAULT_DRAWS;
use crate::domain::generation::DecodeMode;
use crate::ml::decoding::MAX_DECODE_LEN;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the neural generator on a data directory
    Train(TrainArgs),

    /// Decode an input with a trained checkpoint
    Generate(GenerateArgs),

    /// Run the template retrieval baseline
    Retrieve(RetrieveArgs),

    /// Run the lookup baseline
    Lookup(LookupArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory containing train.tsv and optionally val.tsv
    #[arg(long, default_value = "data")]
    pub data_dir: String,

    /// Directory to save checkpoints, config and tokenizer
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Embedding size
    #[arg(long, default_value_t = 64)]
    pub n_emb: usize,

    /// Recurrent hidden size of encoder and decoder
    #[arg(long, default_value_t = 512)]
    pub n_enc: usize,

    #[arg(long, default_value_t = 0.0)]
    pub dropout: f64,

    /// Enable the copy mechanism
    #[arg(long)]
    pub copy: bool,

    /// Let the decoder attend over its own previous states
    #[arg(long)]
    pub self_attention: bool,

    /// Supervise the generation and copy heads separately
    #[arg(long)]
    pub copy_sup: bool,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Share of train.tsv held out when there is no val.tsv
    #[arg(long, default_value_t = 0.1)]
    pub val_fraction: f64,

    /// Vocabulary size cap, special tokens included
    #[arg(long, default_value_t = 10_000)]
    pub max_vocab: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_dir:       a.data_dir,
            checkpoint_dir: a.checkpoint_dir,
            n_emb:          a.n_emb,
            n_enc:          a.n_enc,
            dropout:        a.dropout,
            copy:           a.copy,
            self_attention: a.self_attention,
            copy_sup:       a.copy_sup,
            batch_size:     a.batch_size,
            epochs:         a.epochs,
            lr:             a.lr,
            val_fraction:   a.val_fraction,
            max_vocab:      a.max_vocab,
            seed:           a.seed,
            vocab_size:     0,
        }
    }
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("mode").args(["greedy", "samples", "beam_size"])))]
pub struct GenerateArgs {
    /// Text to decode
    #[arg(long)]
    pub input: String,

    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Argmax decoding (the default)
    #[arg(long)]
    pub greedy: bool,

    /// Draw this many samples
    #[arg(long)]
    pub samples: Option<usize>,

    /// Beam search with this beam size
    #[arg(long)]
    pub beam_size: Option<usize>,

    /// Maximum generated tokens per sequence
    #[arg(long, default_value_t = MAX_DECODE_LEN)]
    pub max_len: usize,
}

impl GenerateArgs {
    pub fn mode(&self) -> DecodeMode {
        match (self.samples, self.beam_size) {
            (Some(count), _)     => DecodeMode::Sample { count },
            (_, Some(beam_size)) => DecodeMode::Beam { beam_size },
            _                    => DecodeMode::Greedy,
        }
    }
}

#[derive(Args, Debug)]
pub struct RetrieveArgs {
    /// Directory containing train.tsv
    #[arg(long, default_value = "data")]
    pub data_dir: String,

    /// Query template with one [HOLE]; drawn at random when omitted
    #[arg(long)]
    pub template: Option<String>,

    /// Longest span replaced by [HOLE] when building templates
    #[arg(long, default_value_t = 2)]
    pub max_span: usize,
}

#[derive(Args, Debug)]
pub struct LookupArgs {
    /// Directory containing train.tsv
    #[arg(long, default_value = "data")]
    pub data_dir: String,

    /// Sequence to look up
    #[arg(long)]
    pub context: String,

    /// Random training draws used to fill the table
    #[arg(long, default_value_t = DEFAULT_DRAWS)]
    pub draws: usize,
}
