// ── Device seam ──
//
// `ReconciliationCore` talks to the device through this trait so the
// reconciliation rules can be exercised without a network.

use std::future::Future;

use fanlink_api::{DeviceClient, DeviceStatus, Error};

/// The four operations of the fan controller's HTTP surface.
///
/// Futures must be `Send` so the core can run inside spawned tasks.
pub trait DeviceApi: Send + Sync + 'static {
    fn fetch_status(&self) -> impl Future<Output = Result<DeviceStatus, Error>> + Send;

    fn set_mode(&self, automatic: bool) -> impl Future<Output = Result<(), Error>> + Send;

    fn set_angle(&self, angle: u8) -> impl Future<Output = Result<(), Error>> + Send;

    fn set_relay(&self, state: bool) -> impl Future<Output = Result<(), Error>> + Send;
}

impl DeviceApi for DeviceClient {
    fn fetch_status(&self) -> impl Future<Output = Result<DeviceStatus, Error>> + Send {
        DeviceClient::fetch_status(self)
    }

    fn set_mode(&self, automatic: bool) -> impl Future<Output = Result<(), Error>> + Send {
        DeviceClient::set_mode(self, automatic)
    }

    fn set_angle(&self, angle: u8) -> impl Future<Output = Result<(), Error>> + Send {
        DeviceClient::set_angle(self, angle)
    }

    fn set_relay(&self, state: bool) -> impl Future<Output = Result<(), Error>> + Send {
        DeviceClient::set_relay(self, state)
    }
}
