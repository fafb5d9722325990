// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Full train + validation loop using Burn's DataLoader and Adam.
//
// Per batch the decoder is either teacher-forced (fed the
// ground-truth prefix) or free-running (fed its own argmax),
// chosen by a coin flip with probability teacher_forcing_ratio.
// Free-running batches are what eventually teach the model to
// survive its own mistakes.
//
// Backend notes:
//   - Training uses Autodiff<Wgpu> for gradients
//   - model.valid() returns the model on the inner Wgpu
//     backend, dropout disabled, for deterministic validation
//   - argmax(2) keeps the reduced dim, so squeeze before
//     comparing with targets
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
};
use rand::Rng;

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::TreeBatcher, dataset::TreeDataset};
use crate::domain::xml_tree::{PAD_ID, SOS_ID};
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::model::{sequence_loss, Hier2HierConfig, Hier2HierModel};

type MyBackend      = burn::backend::Autodiff<burn::backend::Wgpu>;
type MyInnerBackend = burn::backend::Wgpu;

/// Build the model config for a training run. Vocab sizes come
/// from the vocab files, everything else from TrainConfig, so
/// inference can rebuild the identical architecture.
pub fn model_config(
    cfg:               &TrainConfig,
    input_vocab_size:  usize,
    output_vocab_size: usize,
) -> Hier2HierConfig {
    Hier2HierConfig::new(
        input_vocab_size,
        output_vocab_size,
        cfg.symbol_vec_len,
        cfg.node_text_vec_len,
        cfg.propagated_info_len,
        cfg.propagator_stack_depth,
        cfg.decoder_state_width,
        cfg.max_output_len,
        cfg.input_dropout_p,
        cfg.dropout_p,
    )
}

pub fn run_training(
    cfg:               &TrainConfig,
    train_dataset:     TreeDataset,
    val_dataset:       TreeDataset,
    input_vocab_size:  usize,
    output_vocab_size: usize,
    ckpt_manager:      &CheckpointManager,
) -> Result<()> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);

    // ── Build or resume model ─────────────────────────────────────────────────
    let mut model: Hier2HierModel<MyBackend> =
        model_config(cfg, input_vocab_size, output_vocab_size).init(&device);

    let mut start_epoch = 1;
    let mut step        = 0usize;
    if cfg.resume {
        match ckpt_manager.latest()? {
            Some(pointer) => {
                model       = ckpt_manager.load_model(model, &device)?;
                start_epoch = pointer.epoch + 1;
                step        = pointer.step;
                tracing::info!("Resuming from Chk{}.{}", pointer.epoch, pointer.step);
            }
            None => tracing::warn!("Resume requested but no checkpoint found, starting fresh"),
        }
    }
    tracing::info!(
        "Model ready: {} propagation hops, info width {}",
        cfg.propagator_stack_depth,
        cfg.propagated_info_len
    );

    // ── Adam optimiser ────────────────────────────────────────────────────────
    let mut optim = AdamConfig::new().with_epsilon(1e-8).init();

    // ── Data loaders ──────────────────────────────────────────────────────────
    let train_batcher = TreeBatcher::<MyBackend>::new(device.clone());
    let train_loader  = DataLoaderBuilder::new(train_batcher)
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed.unwrap_or(42))
        .num_workers(1)
        .build(train_dataset);

    // Validation runs on the inner backend — no autodiff overhead.
    let val_batcher = TreeBatcher::<MyInnerBackend>::new(device.clone());
    let val_loader  = DataLoaderBuilder::new(val_batcher)
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(val_dataset);

    let metrics_logger = MetricsLogger::new(ckpt_manager.experiment_dir())?;
    let mut rng = rand::thread_rng();

    // ── Epoch loop ────────────────────────────────────────────────────────────
    let end_epoch = start_epoch + cfg.epochs - 1;
    for epoch in start_epoch..=end_epoch {

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;

        for batch in train_loader.iter() {
            let teacher_forcing = rng.gen_bool(cfg.teacher_forcing_ratio.clamp(0.0, 1.0));
            let logits = model.forward_logits(&batch, teacher_forcing, SOS_ID);
            let loss   = sequence_loss(logits, batch.target_out);

            train_loss_sum += loss.clone().into_scalar().elem::<f64>();
            train_batches  += 1;
            step           += 1;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);

            if cfg.print_every > 0 && step % cfg.print_every == 0 {
                tracing::info!(
                    "epoch {} step {} | batch_loss={:.4}",
                    epoch,
                    step,
                    train_loss_sum / train_batches as f64,
                );
            }
        }

        let avg_train_loss = if train_batches > 0 {
            train_loss_sum / train_batches as f64
        } else {
            f64::NAN
        };

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();

        let mut val_loss_sum   = 0.0f64;
        let mut val_batches    = 0usize;
        let mut correct_tokens = 0.0f64;
        let mut total_tokens   = 0.0f64;
        let mut correct_seqs   = 0.0f64;
        let mut total_seqs     = 0.0f64;

        for batch in val_loader.iter() {
            // Validation is always teacher-forced so the loss is
            // comparable across epochs.
            let logits = model_valid.forward_logits(&batch, true, SOS_ID);
            let loss   = sequence_loss(logits.clone(), batch.target_out.clone());
            val_loss_sum += loss.into_scalar().elem::<f64>();
            val_batches  += 1;

            // argmax(2) keeps the reduced dim: [batch, steps, 1]
            let predicted = logits.argmax(2).squeeze::<2>(2);
            let valid     = batch.target_out.clone().equal_elem(PAD_ID as i32)
                .bool_not()
                .float();
            let matched   = predicted.equal(batch.target_out).float() * valid.clone();

            correct_tokens += matched.clone().sum().into_scalar().elem::<f64>();
            total_tokens   += valid.clone().sum().into_scalar().elem::<f64>();

            // A sequence is right when none of its real
            // positions mismatched.
            let wrong_per_seq = ((valid.clone() - matched) ).sum_dim(1);
            let perfect = wrong_per_seq.equal_elem(0.0).float();
            correct_seqs += perfect.sum().into_scalar().elem::<f64>();
            total_seqs   += valid.dims()[0] as f64;
        }

        let avg_val_loss = if val_batches > 0 { val_loss_sum / val_batches as f64 } else { f64::NAN };
        let token_acc    = if total_tokens > 0.0 { correct_tokens / total_tokens } else { 0.0 };
        let seq_acc      = if total_seqs   > 0.0 { correct_seqs / total_seqs } else { 0.0 };

        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | token_acc={:.1}% | seq_acc={:.1}%",
            epoch, end_epoch, avg_train_loss, avg_val_loss,
            token_acc * 100.0, seq_acc * 100.0,
        );

        metrics_logger.log(&EpochMetrics::new(
            epoch, avg_train_loss, avg_val_loss, token_acc, seq_acc,
        ))?;

        if epoch % cfg.checkpoint_every == 0 || epoch == end_epoch {
            ckpt_manager.save_model(&model, epoch, step)?;
            tracing::info!("Checkpoint saved for epoch {}", epoch);
        }
    }

    tracing::info!("Training complete!");
    Ok(())
}
