// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and prints results. All work is
// delegated to Layer 2 (application).
//
//   train    — fit the neural generator, write checkpoints
//   generate — decode an input with the trained generator
//   retrieve — template retrieval baseline
//   lookup   — lookup baseline

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, GenerateArgs, LookupArgs, RetrieveArgs, TrainArgs};

use crate::application::train_use_case::TrainConfig;

#[derive(Parser, Debug)]
#[command(
    name = "seq2seq-lab",
    version = "0.1.0",
    about = "Train an attentional sequence-to-sequence generator and compare it with simple baselines."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// The CLI layer only routes; it never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Generate(args) => run_generate(args),
            Commands::Retrieve(args) => run_retrieve(args),
            Commands::Lookup(args)   => run_lookup(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on pairs in: {}", args.data_dir);
    TrainUseCase::new(args.into()).execute()?;

    println!("Training complete. Checkpoint saved.");
    Ok(())
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    use crate::application::generate_use_case::GenerateUseCase;

    let use_case = GenerateUseCase::new(&args.checkpoint_dir, args.mode(), args.max_len)?;
    let outputs  = use_case.generate(&args.input)?;

    if outputs.is_empty() {
        println!("(no output)");
    }
    for (text, score) in outputs {
        println!("{score:>10.4}  {text}");
    }
    Ok(())
}

fn run_retrieve(args: RetrieveArgs) -> Result<()> {
    use crate::application::baseline_use_case::RetrieveUseCase;

    let max_vocab = TrainConfig::default().max_vocab;
    let use_case  = RetrieveUseCase::new(&args.data_dir, args.max_span, max_vocab)?;
    let retrieved = use_case.retrieve(args.template.as_deref())?;

    println!("Template: {}", retrieved.template);
    match retrieved.neighbors.first() {
        Some(neighbor) => println!("Retrieved: {neighbor}"),
        None           => println!("Retrieved: (nothing)"),
    }
    Ok(())
}

fn run_lookup(args: LookupArgs) -> Result<()> {
    use crate::application::baseline_use_case::LookupUseCase;

    let max_vocab = TrainConfig::default().max_vocab;
    let use_case  = LookupUseCase::new(&args.data_dir, args.draws, max_vocab)?;
    let (matches, counts) = use_case.lookup(&args.context)?;

    for (token, count) in counts {
        println!("{count:>8}  {token}");
    }
    println!("--- {} match(es)", matches.len());
    for m in matches {
        println!("{m}");
    }
    Ok(())
}
