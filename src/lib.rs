pub mod ble;
pub mod config;
pub mod gate;
pub mod logging;
pub mod orchestrator;
pub mod session;
pub mod transport;
