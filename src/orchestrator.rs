use crate::{
    gate::LinkGate,
    session,
    transport::{DiscoveredDevice, Transport, TransportError},
};
use futures::StreamExt;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinSet,
    time::sleep,
};
use tracing::error;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Failed to scan")]
    ScanFailed(#[source] TransportError),
}

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Advertised name a device must match exactly to be connected to.
    pub device_name: String,
    pub scan_timeout: Duration,
    /// No bound when `None`: a hung connect then stalls the gate and every
    /// worker behind it.
    pub connect_timeout: Option<Duration>,
    /// Connection worker pool size.
    pub workers: usize,
    /// Capacity of the address queue feeding the pool. A discovery arriving
    /// while the queue is full is dropped, not waited for.
    pub queue_depth: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        ProbeConfig {
            device_name: "Local".to_owned(),
            scan_timeout: Duration::from_secs(10),
            connect_timeout: None,
            workers: 4,
            queue_depth: 32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Connect,
    /// The advertisement carried no name at all.
    IgnoreUnnamed,
    /// The advertisement carried a name that is not the target.
    IgnoreOther,
}

/// Name filter applied to every discovery. The unnamed and wrong-name cases
/// are deliberately distinct outcomes.
pub fn evaluate(target: &str, device: &DiscoveredDevice) -> FilterDecision {
    match &device.name {
        None => FilterDecision::IgnoreUnnamed,
        Some(name) if name != target => FilterDecision::IgnoreOther,
        Some(_) => FilterDecision::Connect,
    }
}

/// Scan-to-connection orchestration context: owns the transport handle, the
/// serialization gate, and the worker pool for one run.
pub struct Orchestrator<T>
where
    T: Transport + 'static,
{
    transport: Arc<T>,
    config: ProbeConfig,
    gate: LinkGate,
}

impl<T> Orchestrator<T>
where
    T: Transport + 'static,
{
    pub fn new(transport: Arc<T>, config: ProbeConfig) -> Self {
        Orchestrator {
            transport,
            config,
            gate: LinkGate::new(),
        }
    }

    /// Runs one scan window and drains every connection worker before
    /// returning. The gate is held for the whole scan, then by one worker at
    /// a time; matching discoveries are queued without ever blocking the
    /// scan loop.
    pub async fn run(&self) -> Result<(), OrchestratorError> {
        let mut discoveries = self
            .transport
            .discoveries()
            .await
            .map_err(OrchestratorError::ScanFailed)?;

        let (queue, receiver) = mpsc::channel(self.config.queue_depth);
        let receiver = Arc::new(Mutex::new(receiver));
        let mut pool = JoinSet::new();
        for _ in 0..self.config.workers.max(1) {
            pool.spawn(session::worker(
                Arc::clone(&self.transport),
                Arc::clone(&receiver),
                self.gate.clone(),
                self.config.connect_timeout,
            ));
        }

        let permit = self.gate.acquire().await;
        if let Err(e) = self.transport.start_scan().await {
            // symmetric teardown: release the gate and drain the idle pool
            drop(permit);
            drop(queue);
            drain(&mut pool).await;
            return Err(OrchestratorError::ScanFailed(e));
        }

        let deadline = sleep(self.config.scan_timeout);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                _ = &mut deadline => break,
                event = discoveries.next() => match event {
                    Some(device) => self.on_discovered(&device, &queue),
                    None => break,
                },
            }
        }

        if let Err(e) = self.transport.stop_scan().await {
            error!("Failed to stop scanning: {}", e);
        }
        println!("Scan completed");
        drop(permit);

        drop(queue);
        drain(&mut pool).await;
        Ok(())
    }

    fn on_discovered(&self, device: &DiscoveredDevice, queue: &mpsc::Sender<String>) {
        match evaluate(&self.config.device_name, device) {
            FilterDecision::IgnoreUnnamed => {
                println!("Discovered {}", device.address);
            }
            FilterDecision::IgnoreOther => {
                println!(
                    "Discovered {} - '{}'",
                    device.address,
                    device.name.as_deref().unwrap_or_default()
                );
            }
            FilterDecision::Connect => {
                println!(
                    "Discovered {} - '{}'",
                    device.address,
                    device.name.as_deref().unwrap_or_default()
                );
                if let Err(e) = queue.try_send(device.address.clone()) {
                    error!("Failed to queue connection to `{}`: {}", device.address, e);
                }
            }
        }
    }
}

async fn drain(pool: &mut JoinSet<()>) {
    while let Some(result) = pool.join_next().await {
        if let Err(e) = result {
            error!("Connection worker panicked: {}", e);
        }
    }
}
