// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Train + validation loop using Burn's DataLoader and Adam.
//
//   - Training runs on MyBackend (Autodiff<Wgpu>)
//   - model.valid() drops autodiff (and dropout) for validation,
//     so the validation batcher uses MyInnerBackend (Wgpu)
//   - Validation accuracy is next-token accuracy under teacher
//     forcing, counted only where the target is not [PAD]
//   - Every epoch is checkpointed; the epoch with the lowest
//     validation loss is marked best for inference

use anyhow::Result;
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::Seq2SeqBatcher, dataset::Seq2SeqDataset};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::model::{next_tokens, GeneratorConfig, GeneratorModel, GeneratorOutput};

type MyBackend      = burn::backend::Autodiff<burn::backend::Wgpu>;
type MyInnerBackend = burn::backend::Wgpu;

/// Model hyperparameters from a training config.
pub fn generator_config(cfg: &TrainConfig, pad: u32) -> GeneratorConfig {
    GeneratorConfig::new(cfg.vocab_size, pad as usize)
        .with_n_emb(cfg.n_emb)
        .with_n_enc(cfg.n_enc)
        .with_dropout(cfg.dropout)
        .with_copy(cfg.copy)
        .with_self_attention(cfg.self_attention)
}

pub fn run_training(
    cfg:           &TrainConfig,
    pad:           u32,
    train_dataset: Seq2SeqDataset,
    val_dataset:   Seq2SeqDataset,
    ckpt_manager:  CheckpointManager,
) -> Result<()> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop(cfg, pad, train_dataset, val_dataset, ckpt_manager, device)
}

/// Correct and counted (non-pad) next-token predictions.
pub fn token_accuracy<B: Backend>(
    output:  &GeneratorOutput<B>,
    targets: Tensor<B, 2, Int>,
    pad:     u32,
) -> (usize, usize) {
    let [n_batch, n_seq, vocab] = output.log_probs.dims();
    let next = next_tokens(targets);

    // argmax(1) returns [N, 1]; flatten before comparing with [N]
    let pred = output
        .log_probs
        .clone()
        .reshape([n_batch * n_seq, vocab])
        .argmax(1)
        .flatten::<1>(0, 1);
    let counted = next.clone().equal_elem(pad as i64).bool_not().int();

    let correct: i64 = pred
        .equal(next)
        .int()
        .mul(counted.clone())
        .sum()
        .into_scalar()
        .elem::<i64>();
    let total: i64 = counted.sum().into_scalar().elem::<i64>();

    (correct as usize, total as usize)
}

fn train_loop(
    cfg:           &TrainConfig,
    pad:           u32,
    train_dataset: Seq2SeqDataset,
    val_dataset:   Seq2SeqDataset,
    ckpt_manager:  CheckpointManager,
    device:        burn::backend::wgpu::WgpuDevice,
) -> Result<()> {
    MyBackend::seed(cfg.seed);

    // ── Build model ───────────────────────────────────────────────────────────
    let mut model: GeneratorModel<MyBackend> = generator_config(cfg, pad).init(&device);
    tracing::info!(
        "Model ready: vocab={}, n_emb={}, n_enc={}, copy={}, self_attention={}",
        cfg.vocab_size,
        cfg.n_emb,
        cfg.n_enc,
        cfg.copy,
        cfg.self_attention,
    );

    let mut optim = AdamConfig::new().init();
    let metrics   = MetricsLogger::new(ckpt_manager.dir())?;

    // ── Data loaders ──────────────────────────────────────────────────────────
    let train_batcher = Seq2SeqBatcher::<MyBackend>::new(device.clone(), pad);
    let train_loader  = DataLoaderBuilder::new(train_batcher)
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(train_dataset);

    let val_batcher = Seq2SeqBatcher::<MyInnerBackend>::new(device.clone(), pad);
    let val_loader  = DataLoaderBuilder::new(val_batcher)
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(val_dataset);

    let mut best_loss = f64::INFINITY;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;

        for batch in train_loader.iter() {
            let (loss, _) = model.forward_loss(batch, cfg.copy_sup);

            train_loss_sum += loss.clone().into_scalar().elem::<f64>();
            train_batches  += 1;

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(cfg.lr, model, grads);
        }

        let avg_train_loss = if train_batches > 0 {
            train_loss_sum / train_batches as f64
        } else { f64::NAN };

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();

        let mut val_loss_sum = 0.0f64;
        let mut val_batches  = 0usize;
        let mut correct      = 0usize;
        let mut counted      = 0usize;

        for batch in val_loader.iter() {
            let targets = batch.outputs.clone();
            let (loss, output) = model_valid.forward_loss(batch, cfg.copy_sup);

            val_loss_sum += loss.into_scalar().elem::<f64>();
            val_batches  += 1;

            let (c, n) = token_accuracy(&output, targets, pad);
            correct += c;
            counted += n;
        }

        let avg_val_loss  = if val_batches > 0 { val_loss_sum / val_batches as f64 } else { f64::NAN };
        let val_token_acc = if counted > 0 { correct as f64 / counted as f64 } else { 0.0 };

        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | val_token_acc={:.1}%",
            epoch, cfg.epochs, avg_train_loss, avg_val_loss, val_token_acc * 100.0,
        );

        let row = EpochMetrics::new(epoch, avg_train_loss, avg_val_loss, val_token_acc);
        metrics.log(&row)?;

        ckpt_manager.save_model(&model, epoch)?;
        if row.is_improvement(best_loss) {
            best_loss = row.selection_loss();
            ckpt_manager.mark_best(epoch)?;
            tracing::info!("Epoch {} is the new best (loss {:.4})", epoch, best_loss);
        }
    }

    tracing::info!("Training complete! Metrics in '{}'", metrics.csv_path().display());
    Ok(())
}
