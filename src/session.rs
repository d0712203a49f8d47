//! Device session.
//!
//! Owns the bound ring handle and dispatches reports without blocking the caller. Every
//! transport failure is logged and absorbed here.

use std::sync::Arc;

use tokio::task;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::report::{Command, Instruction, Mode, Report};
use crate::transport::{DeviceFilter, HidTransport, Transport};

/// Session with at most one bound ring.
pub struct DeviceSession {
    transport: Option<Arc<dyn Transport>>,
    tracker: TaskTracker,
}

impl DeviceSession {
    /// Session without a device, all sends are ignored.
    pub fn unbound() -> Self {
        Self { transport: None, tracker: TaskTracker::new() }
    }

    /// Session writing to `transport`.
    pub fn bind(transport: Arc<dyn Transport>) -> Self {
        Self { transport: Some(transport), tracker: TaskTracker::new() }
    }

    /// Discover and bind the first device matching `filter`.
    ///
    /// Discovery happens exactly once. If it fails the session stays unbound.
    pub fn open(filter: &DeviceFilter) -> Self {
        match HidTransport::discover(filter) {
            Ok(Some(transport)) => Self::bind(Arc::new(transport)),
            Ok(None) => {
                info!("No {} connected, commands will be ignored", filter.product_name);
                Self::unbound()
            },
            Err(err) => {
                warn!(%err, "Device discovery failed");
                Self::unbound()
            },
        }
    }

    pub fn is_bound(&self) -> bool {
        self.transport.is_some()
    }

    /// Dispatch a single report.
    pub fn send(&self, report: Report) {
        self.send_sequence(vec![report]);
    }

    /// Dispatch reports in order.
    ///
    /// Returns immediately. Each write in the sequence completes before the next one starts, but
    /// separate calls are not ordered relative to each other.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn send_sequence(&self, reports: Vec<Report>) {
        let transport = match &self.transport {
            Some(transport) => Arc::clone(transport),
            None => {
                debug!(count = reports.len(), "No device bound, dropping reports");
                return;
            },
        };

        self.tracker.spawn(async move {
            for report in reports {
                if let Err(err) = write(&transport, report).await {
                    warn!(%err, "Report write failed");
                }
            }
        });
    }

    /// Wait for all dispatched writes to finish.
    pub async fn flush(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Reset the ring to its stored settings and release the handle.
    pub async fn close(self) {
        if self.is_bound() {
            self.send_sequence(vec![
                Instruction::Control(Command::DisableOverride).encode(),
                Instruction::Mode(Mode::Normal).encode(),
            ]);
        }

        self.tracker.close();
        self.tracker.wait().await;

        debug!(bound = self.is_bound(), "Session closed");
    }
}

/// Write a report on the blocking pool.
async fn write(transport: &Arc<dyn Transport>, report: Report) -> Result<(), TransportError> {
    let transport = Arc::clone(transport);

    task::spawn_blocking(move || {
        debug!(%report, "Writing report");
        transport.write_report(&report)
    })
    .await?
}
