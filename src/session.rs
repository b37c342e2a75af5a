use crate::{
    gate::LinkGate,
    transport::{Connection, Transport, TransportError},
};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{mpsc, Mutex},
    time::timeout,
};
use tracing::error;

/// One connection worker. Pulls addresses off the shared queue and runs a
/// connect-discover-disconnect cycle per address, holding the gate for the
/// whole cycle. Every failure inside a cycle is logged and contained; the
/// worker only exits when the queue is closed and empty.
pub(crate) async fn worker<T>(
    transport: Arc<T>,
    queue: Arc<Mutex<mpsc::Receiver<String>>>,
    gate: LinkGate,
    connect_timeout: Option<Duration>,
) where
    T: Transport,
{
    loop {
        let address = { queue.lock().await.recv().await };
        let Some(address) = address else {
            break;
        };

        let permit = gate.acquire().await;
        println!("------------START {} ---------------", address);
        probe(transport.as_ref(), &address, connect_timeout).await;
        println!("------------DONE {} ---------------", address);
        drop(permit);
    }
}

/// One connect-discover-disconnect cycle. The link is always closed once it
/// has been established, even when discovery fails halfway.
async fn probe<T>(transport: &T, address: &str, connect_timeout: Option<Duration>)
where
    T: Transport,
{
    let mut connection = match connect(transport, address, connect_timeout).await {
        Ok(connection) => connection,
        Err(e) => {
            error!("Failed to connect to the bluetooth device `{}`: {}", address, e);
            return;
        }
    };

    if let Err(e) = inspect(&connection).await {
        error!("{}", e);
    }

    if let Err(e) = connection.disconnect().await {
        error!(
            "Failed to disconnect from the bluetooth device `{}`: {}",
            address, e
        );
    }
}

async fn connect<T>(
    transport: &T,
    address: &str,
    connect_timeout: Option<Duration>,
) -> Result<T::Connection, TransportError>
where
    T: Transport,
{
    match connect_timeout {
        Some(limit) => match timeout(limit, transport.connect(address)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::ConnectTimeout {
                address: address.to_owned(),
                timeout: limit,
            }),
        },
        None => transport.connect(address).await,
    }
}

async fn inspect<C: Connection>(connection: &C) -> Result<(), TransportError> {
    let services = connection.discover_services().await?;
    for (i, service) in services.iter().enumerate() {
        println!(
            "service[{}] start_handle:{} end_handle:{} uuid:{}",
            i,
            fmt_handle(service.start_handle, 2),
            fmt_handle(service.end_handle, 2),
            service.uuid
        );
    }

    let characteristics = connection.discover_characteristics().await?;
    for (i, characteristic) in characteristics.iter().enumerate() {
        println!(
            "characteristic[{}] properties:{:02x} value_handle:{} uuid:{}",
            i,
            characteristic.properties,
            fmt_handle(characteristic.value_handle, 4),
            characteristic.uuid
        );
    }

    Ok(())
}

// zero-padded to `width` hex digits, wider only when the value needs it
fn fmt_handle(handle: Option<u16>, width: usize) -> String {
    match handle {
        Some(handle) => format!("{:01$x}", handle, width),
        None => "?".repeat(width),
    }
}
