use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use bytes::Bytes;
use crossbeam_channel::{Receiver, Sender};
use tokio::sync::oneshot;
use crate::assets::mesh::{self, MeshAsset};
use crate::assets::{AssetError, AssetResult, DecodeResult};
use crate::config::settings::DecodeSettings;

/// Bounded pool of background mesh decoders.
///
/// Each worker takes one job at a time from a shared FIFO queue, so excess
/// requests wait in submission order and go to whichever worker frees up first.
pub struct DecodePool {
    sender: Option<Sender<DecodeJob>>,
    workers: Vec<JoinHandle<()>>,
    completed: Arc<AtomicU64>,
    pub pool_config: DecodePoolConfig,
}

#[derive(Debug, Clone)]
pub struct DecodePoolConfig {
    pub workers: usize,
    pub stack_size: Option<usize>,
}

impl Default for DecodePoolConfig {
    fn default() -> Self {
        Self::from(&DecodeSettings::default())
    }
}

impl From<&DecodeSettings> for DecodePoolConfig {
    fn from(settings: &DecodeSettings) -> Self {
        Self {
            workers: settings.workers.max(1),
            stack_size: settings.stack_size_kb.map(|kb| kb * 1024),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DecodePoolStats {
    pub workers: usize,
    pub queued: usize,
    pub completed: u64,
}

struct DecodeJob {
    payload: Bytes,
    reply: oneshot::Sender<DecodeResult<MeshAsset>>,
}

impl DecodePool {
    pub fn new(config: DecodePoolConfig) -> anyhow::Result<Self> {
        tracing::info!("Initializing decode pool with config: {:?}", config);

        let (sender, receiver) = crossbeam_channel::unbounded::<DecodeJob>();
        let completed = Arc::new(AtomicU64::new(0));
        let mut workers = Vec::with_capacity(config.workers);

        for index in 0..config.workers.max(1) {
            let mut builder = std::thread::Builder::new().name(format!("decode-worker-{}", index));
            if let Some(stack_size) = config.stack_size {
                builder = builder.stack_size(stack_size);
            }
            let receiver: Receiver<DecodeJob> = receiver.clone();
            let completed = Arc::clone(&completed);
            let handle = builder
                .spawn(move || worker_loop(receiver, completed))
                .map_err(|e| anyhow::anyhow!("Failed to spawn decode worker {}: {}", index, e))?;
            workers.push(handle);
        }

        tracing::info!("Created decode pool with {} workers", workers.len());

        Ok(Self {
            sender: Some(sender),
            workers,
            completed,
            pool_config: config,
        })
    }

    /// Queue a payload for decoding and wait for the result
    pub async fn decode(&self, payload: Bytes) -> AssetResult<MeshAsset> {
        let sender = self.sender.as_ref().ok_or_else(|| AssetError::WorkerPool {
            reason: "pool is shut down".to_string(),
        })?;
        let (reply, result) = oneshot::channel();
        sender
            .send(DecodeJob { payload, reply })
            .map_err(|e| AssetError::WorkerPool { reason: e.to_string() })?;

        let decoded = result.await.map_err(|e| AssetError::WorkerPool {
            reason: format!("worker dropped job: {}", e),
        })?;
        Ok(decoded?)
    }

    pub fn get_stats(&self) -> DecodePoolStats {
        DecodePoolStats {
            workers: self.workers.len(),
            queued: self.sender.as_ref().map(|s| s.len()).unwrap_or(0),
            completed: self.completed.load(Ordering::Relaxed),
        }
    }
}

fn worker_loop(receiver: Receiver<DecodeJob>, completed: Arc<AtomicU64>) {
    while let Ok(job) = receiver.recv() {
        let result = mesh::decode(&job.payload);
        if let Err(e) = &result {
            tracing::debug!("Decode job failed on {:?}: {}", std::thread::current().name(), e);
        }
        completed.fetch_add(1, Ordering::Relaxed);
        // Receiver may have gone away; nothing to report to
        let _ = job.reply.send(result);
    }
}

impl Drop for DecodePool {
    fn drop(&mut self) {
        // Closing the channel ends every worker loop
        self.sender.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}
