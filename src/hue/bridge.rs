// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connected Hue bridge.

use tokio::sync::Mutex;

use crate::error::Result;
use crate::record::{HueBridgeRecord, RecordId};
use crate::retry::{Operation, RetryPolicy};

use super::client::HueClient;
use super::discovery::DiscoveredBridge;
use super::room::{HueRoom, HueRoomAggregator, HueRoomState, HueRoomStateUpdate};

/// Device type reported to the bridge when requesting a key.
pub const DEVICE_TYPE: &str = "homecontrol#rust";

/// An authenticated session with one Hue bridge.
///
/// Room operations are serialized: a `set_room_state` is never interleaved
/// with another room call on the same bridge.
#[derive(Debug)]
pub struct HueBridge {
    record: HueBridgeRecord,
    api: Mutex<HueClient>,
}

impl HueBridge {
    /// Wraps a client that already carries the record's application key.
    #[must_use]
    pub fn new(record: HueBridgeRecord, api: HueClient) -> Self {
        Self {
            record,
            api: Mutex::new(api),
        }
    }

    /// Returns the record this session was opened from.
    #[must_use]
    pub fn record(&self) -> &HueBridgeRecord {
        &self.record
    }

    /// Returns a copy of the underlying API client for raw resource access.
    pub async fn api(&self) -> HueClient {
        self.api.lock().await.clone()
    }

    /// Resolves the structure of one room.
    ///
    /// # Errors
    ///
    /// See [`HueRoomAggregator::get_room`].
    pub async fn get_room(&self, room_id: &str) -> Result<HueRoom> {
        let api = self.api.lock().await;
        HueRoomAggregator::new(&api).get_room(room_id).await
    }

    /// Resolves the structure of every room.
    ///
    /// # Errors
    ///
    /// See [`HueRoomAggregator::get_rooms`].
    pub async fn get_rooms(&self) -> Result<Vec<HueRoom>> {
        let api = self.api.lock().await;
        HueRoomAggregator::new(&api).get_rooms().await
    }

    /// Reads a snapshot of one room.
    ///
    /// # Errors
    ///
    /// See [`HueRoomAggregator::get_room_state`].
    pub async fn get_room_state(&self, room_id: &str) -> Result<HueRoomState> {
        let api = self.api.lock().await;
        HueRoomAggregator::new(&api).get_room_state(room_id).await
    }

    /// Applies a partial update to one room.
    ///
    /// # Errors
    ///
    /// See [`HueRoomAggregator::set_room_state`].
    pub async fn set_room_state(
        &self,
        room_id: &str,
        update: &HueRoomStateUpdate,
    ) -> Result<HueRoomState> {
        let api = self.api.lock().await;
        HueRoomAggregator::new(&api)
            .set_room_state(room_id, update)
            .await
    }
}

/// Requests an application key from a discovered bridge and builds its record.
///
/// `api` must point at the bridge and carry no application key. Transport
/// failures are retried by `retry`; a bridge whose link button has not been
/// pressed fails at once so the caller can prompt the user.
///
/// # Errors
///
/// - [`HueError::ButtonNotPressed`](crate::error::HueError::ButtonNotPressed)
///   if the link button was not pressed.
/// - [`HueError::UnexpectedAuthResponse`](crate::error::HueError::UnexpectedAuthResponse)
///   for any other refusal.
/// - [`Error::Authentication`](crate::Error::Authentication) once transport
///   failures exhaust `retry`.
pub async fn authenticate(
    api: &HueClient,
    name: &str,
    bridge: &DiscoveredBridge,
    retry: RetryPolicy,
) -> Result<HueBridgeRecord> {
    let key = retry
        .run(api.address(), Operation::Authenticate, async || {
            api.request_key(DEVICE_TYPE).await
        })
        .await?;

    tracing::info!(bridge_id = %bridge.id, address = %bridge.host(), name, "Hue bridge authenticated");
    Ok(HueBridgeRecord {
        id: RecordId::new(),
        name: name.to_string(),
        ip_address: bridge.internalipaddress.clone(),
        port: bridge.port,
        identifier: bridge.id.clone(),
        username: key.username,
        client_key: key.client_key,
    })
}
