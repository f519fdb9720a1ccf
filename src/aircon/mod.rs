// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Midea air conditioning units.
//!
//! The protocol binding is supplied by the host through [`AcConnector`].
//! This module adds what the binding does not: validation of requested
//! states, bounded retries on every round trip, a workaround for the
//! false-zero sensor reading, and the explicit display toggle.
//!
//! # Examples
//!
//! ```no_run
//! use homecontrol::aircon::{AcManager, AcHandleFactory};
//! use homecontrol::store::InMemoryStore;
//!
//! # async fn example(connector: impl homecontrol::aircon::AcConnector, id: homecontrol::record::RecordId) -> homecontrol::Result<()> {
//! let store = InMemoryStore::new();
//! let manager = AcManager::new(AcHandleFactory::new(connector));
//!
//! let unit = manager.get(&store, id).await?;
//! let mut state = unit.get_state().await?;
//! state.target_temperature = 21.0;
//! unit.set_state(&state).await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod device;
mod discovery;
mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{AcClient, AcConnector, DiscoveredAc, MIDEA_PORT};
pub use device::AcDevice;
pub use discovery::{PROBE_ATTEMPTS, discover};
pub use state::{
    AcMode, AcReading, AcSettings, AcState, AcTransition, FanSpeed, MAX_TARGET_TEMPERATURE,
    MIN_TARGET_TEMPERATURE, SwingMode,
};

use crate::error::Result;
use crate::manager::{DeviceRegistry, HandleFactory};
use crate::record::AcDeviceRecord;
use crate::retry::RetryPolicy;

/// Registry of connected air conditioning units.
pub type AcManager<C> = DeviceRegistry<AcHandleFactory<C>>;

/// Opens [`AcDevice`] sessions from stored records.
#[derive(Debug)]
pub struct AcHandleFactory<C> {
    connector: C,
    retry: RetryPolicy,
}

impl<C: AcConnector> AcHandleFactory<C> {
    /// Creates a factory using the default immediate retry policy.
    #[must_use]
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            retry: RetryPolicy::immediate(),
        }
    }

    /// Sets the retry policy used for authenticate, refresh and apply.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the connector, for discovery.
    #[must_use]
    pub fn connector(&self) -> &C {
        &self.connector
    }
}

impl<C: AcConnector> HandleFactory for AcHandleFactory<C> {
    type Record = AcDeviceRecord;
    type Handle = AcDevice<C::Client>;

    async fn build(&self, record: AcDeviceRecord) -> Result<Self::Handle> {
        let client = self
            .connector
            .connect(&record.ip_address, record.identifier, MIDEA_PORT);
        AcDevice::connect(record, client, self.retry).await
    }
}
