//! Report transport abstraction.

use hidapi::{HidApi, HidDevice};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::TransportError;
use crate::report::Report;

/// Adafruit USB vendor ID.
pub const CAMRING_VID: u16 = 0x239a;

/// CamRing USB product ID.
pub const CAMRING_PID: u16 = 32971;

/// HID product string announced by the ring firmware.
pub const CAMRING_PRODUCT: &str = "CamRing";

/// Blocking sink for output reports.
pub trait Transport: Send + Sync {
    /// Write one complete report.
    fn write_report(&self, report: &Report) -> Result<(), TransportError>;
}

/// Criteria a connected HID device must match to be bound.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct DeviceFilter {
    pub vendor_id: u16,
    pub product_id: u16,
    pub product_name: String,
}

impl Default for DeviceFilter {
    fn default() -> Self {
        Self {
            vendor_id: CAMRING_VID,
            product_id: CAMRING_PID,
            product_name: CAMRING_PRODUCT.into(),
        }
    }
}

impl DeviceFilter {
    /// Check if a device matches.
    ///
    /// The product name must match exactly, devices without a product string never match.
    pub fn matches(&self, vendor_id: u16, product_id: u16, product_name: Option<&str>) -> bool {
        vendor_id == self.vendor_id
            && product_id == self.product_id
            && product_name == Some(self.product_name.as_str())
    }
}

/// Transport writing to a hidapi device handle.
pub struct HidTransport {
    device: Mutex<HidDevice>,
}

impl HidTransport {
    /// Open the first connected device matching `filter`.
    ///
    /// Returns `Ok(None)` if no device matches.
    pub fn discover(filter: &DeviceFilter) -> Result<Option<Self>, TransportError> {
        let api = HidApi::new().map_err(TransportError::Api)?;

        let device_info = api.device_list().find(|device_info| {
            filter.matches(
                device_info.vendor_id(),
                device_info.product_id(),
                device_info.product_string(),
            )
        });

        let device_info = match device_info {
            Some(device_info) => device_info,
            None => {
                debug!(
                    vendor_id = filter.vendor_id,
                    product_id = filter.product_id,
                    product_name = %filter.product_name,
                    "No matching HID device"
                );
                return Ok(None);
            },
        };

        let device = device_info.open_device(&api).map_err(TransportError::Open)?;

        info!(path = ?device_info.path(), "Bound {}", filter.product_name);

        Ok(Some(Self { device: Mutex::new(device) }))
    }
}

impl Transport for HidTransport {
    fn write_report(&self, report: &Report) -> Result<(), TransportError> {
        let written = self.device.lock().write(report).map_err(TransportError::Write)?;

        if written < report.len() {
            return Err(TransportError::ShortWrite { written, expected: report.len() });
        }

        Ok(())
    }
}

/// Transport logging reports instead of transmitting them.
pub struct DryRunTransport;

impl Transport for DryRunTransport {
    fn write_report(&self, report: &Report) -> Result<(), TransportError> {
        info!(%report, "Dry run");
        Ok(())
    }
}
