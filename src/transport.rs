use async_trait::async_trait;
use futures::Stream;
use std::{pin::Pin, time::Duration};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to open bluetooth adapter: {0}")]
    AdapterOpen(String),

    #[error("Failed to scan: {0}")]
    Scan(String),

    #[error("Failed to connect to `{address}`: {reason}")]
    Connect { address: String, reason: String },

    #[error("Connection to `{address}` timed out after {timeout:?}")]
    ConnectTimeout { address: String, timeout: Duration },

    #[error("Failed to discover {what}: {reason}")]
    Discovery { what: &'static str, reason: String },

    #[error("Failed to disconnect from `{address}`: {reason}")]
    Disconnect { address: String, reason: String },
}

/// One advertisement as delivered by the adapter. Both fields are owned
/// copies, detached from any transport-internal buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    pub address: String,
    pub name: Option<String>,
}

/// A primary GATT service. ATT handles are optional because not every
/// backend surfaces them (btleplug does not).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceInfo {
    pub uuid: Uuid,
    pub start_handle: Option<u16>,
    pub end_handle: Option<u16>,
}

/// A GATT characteristic. `properties` is the raw GATT properties bitfield.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacteristicInfo {
    pub uuid: Uuid,
    pub value_handle: Option<u16>,
    pub properties: u8,
}

pub type DiscoveryStream = Pin<Box<dyn Stream<Item = DiscoveredDevice> + Send>>;

/// Link-layer side of a BLE central. The orchestrator is generic over this
/// trait so the whole scan-to-connection cycle can run against a scripted
/// transport in tests.
///
/// Callers are responsible for serializing link-layer operations; the
/// transport itself assumes at most one of scan or connect-sequence is in
/// flight at any time.
#[async_trait]
pub trait Transport: Send + Sync {
    type Connection: Connection + 'static;

    /// Discovery event stream. Must be obtained before `start_scan` so no
    /// early advertisement is missed.
    async fn discoveries(&self) -> Result<DiscoveryStream, TransportError>;

    async fn start_scan(&self) -> Result<(), TransportError>;

    async fn stop_scan(&self) -> Result<(), TransportError>;

    async fn connect(&self, address: &str) -> Result<Self::Connection, TransportError>;
}

/// An established link to one peripheral. `Sync` is required because a
/// worker holds a shared borrow of the connection across await points.
#[async_trait]
pub trait Connection: Send + Sync {
    async fn discover_services(&self) -> Result<Vec<ServiceInfo>, TransportError>;

    async fn discover_characteristics(&self) -> Result<Vec<CharacteristicInfo>, TransportError>;

    /// Closes the link. Idempotent: disconnecting an already-closed link is
    /// a no-op success.
    async fn disconnect(&mut self) -> Result<(), TransportError>;
}
