// fanlink-api: Async Rust client for the ESP32 fan controller HTTP API

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::DeviceClient;
pub use error::Error;
pub use models::{AngleRequest, DeviceStatus, ModeRequest, RelayRequest};
pub use transport::TransportConfig;
