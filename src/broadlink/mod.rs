// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broadlink IR blasters.
//!
//! A Broadlink device learns raw IR packets from a remote and plays them
//! back. Learned packets are stored as [`BroadlinkAction`] records by the
//! [`BroadlinkService`](crate::service::BroadlinkService).
//!
//! [`BroadlinkAction`]: crate::record::BroadlinkAction

mod client;
mod device;
mod discovery;

#[cfg(test)]
pub(crate) mod testing;

use std::time::Duration;

pub use client::{BroadlinkClient, BroadlinkConnector, DiscoveredBroadlink};
pub use device::{BroadlinkDevice, LEARNING_WINDOW, POLL_INTERVAL};
pub use discovery::{discover, discover_all};

use crate::error::{Error, Result};
use crate::manager::{DeviceRegistry, HandleFactory};
use crate::record::BroadlinkDeviceRecord;
use crate::retry::Operation;

/// Registry of connected Broadlink devices.
pub type BroadlinkManager<C> = DeviceRegistry<BroadlinkHandleFactory<C>>;

/// Opens [`BroadlinkDevice`] sessions from stored records.
#[derive(Debug)]
pub struct BroadlinkHandleFactory<C> {
    connector: C,
    learning_window: Duration,
}

impl<C: BroadlinkConnector> BroadlinkHandleFactory<C> {
    /// Creates a factory with the default learning window.
    #[must_use]
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            learning_window: LEARNING_WINDOW,
        }
    }

    /// Sets the learning window given to every device.
    #[must_use]
    pub fn with_learning_window(mut self, window: Duration) -> Self {
        self.learning_window = window;
        self
    }

    /// Returns the connector, for discovery.
    #[must_use]
    pub fn connector(&self) -> &C {
        &self.connector
    }
}

impl<C: BroadlinkConnector> HandleFactory for BroadlinkHandleFactory<C> {
    type Record = BroadlinkDeviceRecord;
    type Handle = BroadlinkDevice<C::Client>;

    async fn build(&self, record: BroadlinkDeviceRecord) -> Result<Self::Handle> {
        let client = match self.connector.hello(&record.ip_address).await {
            Ok(client) => client,
            Err(Error::Protocol(source)) => {
                return Err(Error::Connection {
                    target: record.id.to_string(),
                    operation: Operation::Authenticate,
                    attempts: 1,
                    source,
                });
            }
            Err(e) => return Err(e),
        };
        let device = BroadlinkDevice::connect(record, client).await?;
        Ok(device.with_learning_window(self.learning_window))
    }
}
