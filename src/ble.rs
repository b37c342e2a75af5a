use crate::transport::{
    CharacteristicInfo, Connection, DiscoveredDevice, DiscoveryStream, ServiceInfo, Transport,
    TransportError,
};
use async_trait::async_trait;
use btleplug::{
    api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter},
    platform::{Adapter, Manager, Peripheral},
};
use futures::StreamExt;
use tracing::trace;

/// btleplug-backed transport. The adapter handle is released by `Drop`, so
/// every exit path of the orchestrator tears it down.
pub struct BtleTransport {
    adapter: Adapter,
}

impl BtleTransport {
    /// Opens the named adapter, or the first available one when no name is
    /// given.
    pub async fn open(adapter_name: Option<&str>) -> Result<Self, TransportError> {
        let manager = Manager::new()
            .await
            .map_err(|e| TransportError::AdapterOpen(e.to_string()))?;
        let adapters = manager
            .adapters()
            .await
            .map_err(|e| TransportError::AdapterOpen(e.to_string()))?;

        let adapter = match adapter_name {
            Some(name) => {
                let mut found = None;
                for adapter in adapters {
                    let info = adapter
                        .adapter_info()
                        .await
                        .map_err(|e| TransportError::AdapterOpen(e.to_string()))?;
                    if info.contains(name) {
                        found = Some(adapter);
                        break;
                    }
                }
                found.ok_or_else(|| {
                    TransportError::AdapterOpen(format!("no adapter matching `{}`", name))
                })?
            }
            None => adapters
                .into_iter()
                .next()
                .ok_or_else(|| TransportError::AdapterOpen("no bluetooth adapter".to_owned()))?,
        };

        Ok(BtleTransport { adapter })
    }
}

#[async_trait]
impl Transport for BtleTransport {
    type Connection = BtleConnection;

    async fn discoveries(&self) -> Result<DiscoveryStream, TransportError> {
        let events = self
            .adapter
            .events()
            .await
            .map_err(|e| TransportError::Scan(e.to_string()))?;
        let adapter = self.adapter.clone();
        let stream = events.filter_map(move |event| {
            let adapter = adapter.clone();
            async move {
                let CentralEvent::DeviceDiscovered(id) = event else {
                    return None;
                };
                trace!("Discovered device: {:?}", id);
                let peripheral = adapter.peripheral(&id).await.ok()?;
                let name = peripheral
                    .properties()
                    .await
                    .ok()
                    .flatten()
                    .and_then(|properties| properties.local_name);
                Some(DiscoveredDevice {
                    address: peripheral.address().to_string(),
                    name,
                })
            }
        });
        Ok(Box::pin(stream))
    }

    async fn start_scan(&self) -> Result<(), TransportError> {
        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(|e| TransportError::Scan(e.to_string()))
    }

    async fn stop_scan(&self) -> Result<(), TransportError> {
        self.adapter
            .stop_scan()
            .await
            .map_err(|e| TransportError::Scan(e.to_string()))
    }

    async fn connect(&self, address: &str) -> Result<Self::Connection, TransportError> {
        let peripherals = self
            .adapter
            .peripherals()
            .await
            .map_err(|e| TransportError::Connect {
                address: address.to_owned(),
                reason: e.to_string(),
            })?;
        let device = peripherals
            .into_iter()
            .find(|peripheral| peripheral.address().to_string() == address)
            .ok_or_else(|| TransportError::Connect {
                address: address.to_owned(),
                reason: "device is no longer known to the adapter".to_owned(),
            })?;

        device.connect().await.map_err(|e| TransportError::Connect {
            address: address.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(BtleConnection {
            device,
            address: address.to_owned(),
            open: true,
        })
    }
}

pub struct BtleConnection {
    device: Peripheral,
    address: String,
    open: bool,
}

#[async_trait]
impl Connection for BtleConnection {
    async fn discover_services(&self) -> Result<Vec<ServiceInfo>, TransportError> {
        self.device
            .discover_services()
            .await
            .map_err(|e| TransportError::Discovery {
                what: "primary services",
                reason: e.to_string(),
            })?;
        Ok(self
            .device
            .services()
            .into_iter()
            .map(|service| ServiceInfo {
                uuid: service.uuid,
                // btleplug does not expose ATT handle ranges
                start_handle: None,
                end_handle: None,
            })
            .collect())
    }

    async fn discover_characteristics(&self) -> Result<Vec<CharacteristicInfo>, TransportError> {
        // characteristics are cached by the service discovery above
        Ok(self
            .device
            .characteristics()
            .into_iter()
            .map(|characteristic| CharacteristicInfo {
                uuid: characteristic.uuid,
                value_handle: None,
                properties: characteristic.properties.bits(),
            })
            .collect())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        self.device
            .disconnect()
            .await
            .map_err(|e| TransportError::Disconnect {
                address: self.address.clone(),
                reason: e.to_string(),
            })
    }
}
