// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Philips Hue bridges over the CLIP v2 API.
//!
//! Unlike the other protocols, the Hue transport is plain HTTPS and is
//! implemented here directly on `reqwest`. [`HueClient`] exposes the raw
//! resources; [`HueRoomAggregator`] builds the room level view used by the
//! service layer.
//!
//! # Examples
//!
//! ```no_run
//! use homecontrol::hue::{HueClient, HueRoomStateUpdate, HueGroupedLightUpdate, HUE_ROOT_CA};
//! use homecontrol::hue::HueRoomAggregator;
//!
//! # async fn example() -> homecontrol::Result<()> {
//! let api = HueClient::new("192.168.1.2", Some("application-key"), HUE_ROOT_CA)?;
//! let rooms = HueRoomAggregator::new(&api);
//!
//! let update = HueRoomStateUpdate {
//!     grouped_light: Some(HueGroupedLightUpdate { on: Some(true), brightness: Some(60.0) }),
//!     ..HueRoomStateUpdate::default()
//! };
//! let state = rooms.set_room_state("room-id", &update).await?;
//! println!("{:?}", state.grouped_light);
//! # Ok(())
//! # }
//! ```

mod bridge;
mod client;
mod discovery;
mod mdns;
mod room;
pub mod schema;

pub use bridge::{DEVICE_TYPE, HueBridge, authenticate};
pub use client::{ApplicationKey, HUE_ROOT_CA, HueClient, REQUEST_TIMEOUT};
pub use discovery::{
    CLOUD_DISCOVERY_URL, DiscoveredBridge, MDNS_WINDOW, discover_bridges, discover_cloud,
    discover_mdns,
};
pub use room::{
    HueColour, HueGroupedLightState, HueGroupedLightUpdate, HueLightState, HueLightUpdate,
    HueRoom, HueRoomAggregator, HueRoomLight, HueRoomState, HueRoomStateUpdate, HueSceneState,
    HueSceneStatus,
};

use crate::error::Result;
use crate::manager::{DeviceRegistry, HandleFactory};
use crate::record::HueBridgeRecord;

/// Registry of connected Hue bridges.
pub type HueManager = DeviceRegistry<HueHandleFactory>;

/// Opens [`HueBridge`] sessions from stored records.
///
/// Building a handle performs no I/O: the bridge is stateless HTTP and the
/// stored key is only checked by the first request.
#[derive(Debug, Clone)]
pub struct HueHandleFactory {
    ca_cert: Vec<u8>,
    base_url: Option<String>,
}

impl HueHandleFactory {
    /// Creates a factory trusting `ca_cert` (PEM).
    #[must_use]
    pub fn new(ca_cert: impl Into<Vec<u8>>) -> Self {
        Self {
            ca_cert: ca_cert.into(),
            base_url: None,
        }
    }

    /// Sends every bridge's requests to `base_url` instead of
    /// `https://{ip}:{port}`.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Creates a client for `address` without an application key, used to
    /// authenticate a newly discovered bridge.
    ///
    /// # Errors
    ///
    /// Returns an error if the CA certificate cannot be loaded.
    pub fn unauthenticated_client(&self, address: &str) -> Result<HueClient> {
        self.client(address, None)
    }

    fn client(&self, address: &str, key: Option<&str>) -> Result<HueClient> {
        let client = HueClient::new(address, key, &self.ca_cert)?;
        Ok(match &self.base_url {
            Some(base_url) => client.with_base_url(base_url.clone()),
            None => client,
        })
    }
}

impl Default for HueHandleFactory {
    fn default() -> Self {
        Self::new(HUE_ROOT_CA)
    }
}

impl HandleFactory for HueHandleFactory {
    type Record = HueBridgeRecord;
    type Handle = HueBridge;

    async fn build(&self, record: HueBridgeRecord) -> Result<HueBridge> {
        let api = self.client(&record.host(), Some(&record.username))?;
        Ok(HueBridge::new(record, api))
    }
}
