//! End-to-end training simulation test
//!
//! Simulates a training run that checkpoints every epoch, crashes, and is
//! resumed by a fresh process:
//! - run directory bootstrap and resume detection
//! - bounded retention while training
//! - restore into freshly constructed model/optimizer/scheduler
//! - resumed training matches uninterrupted training exactly

use anyhow::Result;
use bytes::Bytes;
use checkpoint::{CheckpointStore, Module, Stateful, TrainingState};
use chrono::Local;
use runtime_core::{CheckpointConfig, Epoch, Error, RunLayout};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

fn encode<T: Serialize>(value: &T) -> runtime_core::Result<Bytes> {
    Ok(Bytes::from(bincode::serialize(value)?))
}

fn decode<T: DeserializeOwned>(state: &[u8]) -> runtime_core::Result<T> {
    Ok(bincode::deserialize(state)?)
}

/// Linear model pulled towards a fixed target
#[derive(Debug, Clone, PartialEq)]
struct LinearModel {
    name: String,
    weights: Vec<f32>,
}

impl LinearModel {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            weights: vec![0.0; 4],
        }
    }

    fn gradients(&self) -> Vec<f32> {
        let target = [1.0f32, -2.0, 0.5, 3.0];
        self.weights
            .iter()
            .zip(target)
            .map(|(w, t)| w - t)
            .collect()
    }
}

impl Stateful for LinearModel {
    fn state_dict(&self) -> runtime_core::Result<Bytes> {
        encode(&self.weights)
    }

    fn load_state_dict(&mut self, state: &[u8]) -> runtime_core::Result<()> {
        self.weights = decode(state)?;
        Ok(())
    }
}

impl Module for LinearModel {
    fn name(&self) -> &str {
        &self.name
    }
}

/// SGD with momentum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Sgd {
    momentum: f32,
    velocity: Vec<f32>,
    steps: u64,
}

impl Sgd {
    fn new() -> Self {
        Self {
            momentum: 0.9,
            velocity: vec![0.0; 4],
            steps: 0,
        }
    }

    fn step(&mut self, model: &mut LinearModel, lr: f32) {
        let grads = model.gradients();
        for ((w, v), g) in model.weights.iter_mut().zip(&mut self.velocity).zip(grads) {
            *v = self.momentum * *v + g;
            *w -= lr * *v;
        }
        self.steps += 1;
    }
}

impl Stateful for Sgd {
    fn state_dict(&self) -> runtime_core::Result<Bytes> {
        encode(self)
    }

    fn load_state_dict(&mut self, state: &[u8]) -> runtime_core::Result<()> {
        *self = decode(state)?;
        Ok(())
    }
}

/// Step learning-rate decay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StepLr {
    lr: f32,
    gamma: f32,
    step_size: u64,
    last_epoch: u64,
}

impl StepLr {
    fn new() -> Self {
        Self {
            lr: 0.1,
            gamma: 0.5,
            step_size: 2,
            last_epoch: 0,
        }
    }

    fn step(&mut self) {
        self.last_epoch += 1;
        if self.last_epoch % self.step_size == 0 {
            self.lr *= self.gamma;
        }
    }
}

impl Stateful for StepLr {
    fn state_dict(&self) -> runtime_core::Result<Bytes> {
        encode(self)
    }

    fn load_state_dict(&mut self, state: &[u8]) -> runtime_core::Result<()> {
        *self = decode(state)?;
        Ok(())
    }
}

struct Trainer {
    model: LinearModel,
    optimizer: Sgd,
    scheduler: StepLr,
}

impl Trainer {
    fn new(name: &str) -> Self {
        Self {
            model: LinearModel::new(name),
            optimizer: Sgd::new(),
            scheduler: StepLr::new(),
        }
    }

    fn train_epoch(&mut self) {
        for _ in 0..10 {
            self.optimizer.step(&mut self.model, self.scheduler.lr);
        }
        self.scheduler.step();
    }

    async fn run(&mut self, store: &CheckpointStore, epochs: std::ops::RangeInclusive<Epoch>) -> Result<()> {
        for epoch in epochs {
            self.train_epoch();
            store
                .make_checkpoint(&self.model, &self.optimizer, epoch, Some(&self.scheduler))
                .await?;
        }
        Ok(())
    }

    async fn resume(&mut self, store: &CheckpointStore) -> Result<Option<Epoch>> {
        Ok(store
            .restore_into(&mut self.model, &mut self.optimizer, Some(&mut self.scheduler))
            .await?)
    }
}

fn snapshot_files(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_crash_and_resume_matches_uninterrupted_run() -> Result<()> {
    let root = tempfile::tempdir()?;

    // First process: fresh run directory, train 5 epochs, then "crash"
    let layout = RunLayout::prepare(root.path(), "e2e", Local::now())?;
    assert!(!layout.resumed);
    {
        let store = CheckpointStore::open(CheckpointConfig::new(&layout.checkpoint_dir, 3)).await?;
        let mut trainer = Trainer::new("linear");
        assert_eq!(trainer.resume(&store).await?, None);
        trainer.run(&store, 1..=5).await?;
    }
    assert_eq!(
        snapshot_files(&layout.checkpoint_dir),
        vec!["linear_epoch_3.ckpt", "linear_epoch_4.ckpt", "linear_epoch_5.ckpt"]
    );

    // Second process: same output dir is detected as a resumable run
    let resumed_layout = RunLayout::prepare(&layout.out_dir, "e2e", Local::now())?;
    assert!(resumed_layout.resumed);
    assert_eq!(resumed_layout.checkpoint_dir, layout.checkpoint_dir);

    let store =
        CheckpointStore::open(CheckpointConfig::new(&resumed_layout.checkpoint_dir, 3)).await?;
    let mut resumed = Trainer::new("linear");
    let start = resumed.resume(&store).await?.expect("snapshot to resume from");
    assert_eq!(start, 5);
    resumed.run(&store, start + 1..=8).await?;

    let mut uninterrupted = Trainer::new("linear");
    for _ in 1..=8 {
        uninterrupted.train_epoch();
    }

    assert_eq!(resumed.model, uninterrupted.model);
    assert_eq!(resumed.optimizer, uninterrupted.optimizer);
    assert_eq!(resumed.scheduler, uninterrupted.scheduler);
    assert_eq!(
        snapshot_files(&layout.checkpoint_dir),
        vec!["linear_epoch_6.ckpt", "linear_epoch_7.ckpt", "linear_epoch_8.ckpt"]
    );
    Ok(())
}

#[tokio::test]
async fn test_generator_and_discriminator_share_directory() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = CheckpointStore::open(CheckpointConfig::new(dir.path(), 2)).await?;

    let mut generator = Trainer::new("generator");
    let mut discriminator = Trainer::new("discriminator");
    for epoch in 1..=4 {
        generator.train_epoch();
        store
            .make_checkpoint(&generator.model, &generator.optimizer, epoch, None)
            .await?;
        if epoch % 2 == 0 {
            discriminator.train_epoch();
            store
                .make_checkpoint(&discriminator.model, &discriminator.optimizer, epoch, None)
                .await?;
        }
    }

    let generator_epochs: Vec<_> = store
        .list_snapshots("generator")
        .await?
        .iter()
        .map(|s| s.epoch)
        .collect();
    assert_eq!(generator_epochs, vec![4, 3]);

    let discriminator_epochs: Vec<_> = store
        .list_snapshots("discriminator")
        .await?
        .iter()
        .map(|s| s.epoch)
        .collect();
    assert_eq!(discriminator_epochs, vec![4, 2]);
    Ok(())
}

#[tokio::test]
async fn test_payload_round_trip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = CheckpointStore::open(CheckpointConfig::new(dir.path(), 5)).await?;

    let saved = TrainingState::new(
        17,
        Bytes::from((0..=255u8).collect::<Vec<_>>()),
        Bytes::from_static(b"optimizer-state"),
    )
    .with_scheduler(Bytes::from_static(b"scheduler-state"))
    .with_metadata("loss", "0.0314")
    .with_metadata("git", "abc123");

    store.save("model", &saved).await?;
    let (epoch, restored) = store.restore("model").await?.expect("snapshot");

    assert_eq!(epoch, 17);
    assert_eq!(restored, saved);
    Ok(())
}

#[tokio::test]
async fn test_lock_files_reject_second_writer() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = CheckpointConfig::new(dir.path(), 2).lock_files(true);
    let store = CheckpointStore::open(config.clone()).await?;
    let other = CheckpointStore::open(config).await?;

    let trainer = Trainer::new("model");
    store
        .make_checkpoint(&trainer.model, &trainer.optimizer, 1, None)
        .await?;

    let _held = checkpoint::ModuleLock::try_acquire(dir.path(), "model")?;
    let err = other
        .make_checkpoint(&trainer.model, &trainer.optimizer, 2, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ModuleLocked { .. }));
    assert!(err.is_io());

    // Other modules are unaffected
    let critic = Trainer::new("critic");
    other
        .make_checkpoint(&critic.model, &critic.optimizer, 1, None)
        .await?;
    Ok(())
}
