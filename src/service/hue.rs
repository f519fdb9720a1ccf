// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use crate::config::HueConfig;
use crate::error::{Error, HueError, Result};
use crate::hue::{
    DiscoveredBridge, HueBridge, HueManager, HueRoom, HueRoomState, HueRoomStateUpdate,
    authenticate, discover_bridges,
};
use crate::record::{HueBridgeRecord, RecordId};
use crate::retry::RetryPolicy;
use crate::store::{Database, RecordStore};

/// Hue operations for one session.
#[derive(Debug)]
pub struct HueService<'a, D> {
    db: &'a D,
    manager: &'a HueManager,
    config: &'a HueConfig,
}

impl<'a, D: Database> HueService<'a, D> {
    pub(crate) fn new(db: &'a D, manager: &'a HueManager, config: &'a HueConfig) -> Self {
        Self {
            db,
            manager,
            config,
        }
    }

    /// Returns the bridge with `id`.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown id.
    pub async fn get(&self, id: RecordId) -> Result<Arc<HueBridge>> {
        self.manager.get(self.db, id).await
    }

    /// Returns the bridge called `name`.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown name.
    pub async fn get_by_name(&self, name: &str) -> Result<Arc<HueBridge>> {
        self.manager.get_by_name(self.db, name).await
    }

    /// Lists every stored bridge.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    pub async fn list(&self) -> Result<Vec<HueBridgeRecord>> {
        RecordStore::<HueBridgeRecord>::get_all(self.db).await
    }

    /// Finds bridges using the configured discovery method.
    ///
    /// # Errors
    ///
    /// See [`discover_bridges`].
    pub async fn discover(&self) -> Result<Vec<DiscoveredBridge>> {
        discover_bridges(self.config.mdns_discovery).await
    }

    /// Obtains an application key from `bridge`, stores it as `name` and
    /// returns its session.
    ///
    /// # Errors
    ///
    /// - [`HueError::ButtonNotPressed`] if the link button was not pressed.
    /// - [`Error::Authentication`] once transport failures exhaust retries.
    /// - [`Error::DuplicateEntry`] if the name or address is taken.
    pub async fn add_bridge(&self, name: &str, bridge: &DiscoveredBridge) -> Result<Arc<HueBridge>> {
        let api = self
            .manager
            .factory()
            .unauthenticated_client(&bridge.host())?;
        let record = authenticate(&api, name, bridge, RetryPolicy::with_pause()).await?;
        let record = RecordStore::<HueBridgeRecord>::create(self.db, record).await?;
        self.manager.add(record).await
    }

    /// Adds every bridge in `bridges` whose link button has been pressed.
    ///
    /// `name_for` receives each bridge's position in `bridges`. Returns the
    /// bridges still waiting for their button, so the caller can prompt the
    /// user and pass them back in.
    ///
    /// # Errors
    ///
    /// Returns the first failure other than
    /// [`HueError::ButtonNotPressed`]. Bridges added before it stay added.
    pub async fn add_discovered(
        &self,
        bridges: Vec<DiscoveredBridge>,
        mut name_for: impl FnMut(usize, &DiscoveredBridge) -> String,
    ) -> Result<Vec<DiscoveredBridge>> {
        let mut pending = Vec::new();
        for (index, bridge) in bridges.into_iter().enumerate() {
            match self.add_bridge(&name_for(index, &bridge), &bridge).await {
                Ok(_) => {}
                Err(Error::Hue(HueError::ButtonNotPressed { .. })) => {
                    tracing::info!(bridge_id = %bridge.id, "Waiting for link button");
                    pending.push(bridge);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(pending)
    }

    /// Discovers bridges and adds every one whose link button has been
    /// pressed. See [`add_discovered`](Self::add_discovered).
    ///
    /// # Errors
    ///
    /// Returns discovery failures, or the first add failure other than
    /// [`HueError::ButtonNotPressed`].
    pub async fn discover_and_add_all(
        &self,
        name_for: impl FnMut(usize, &DiscoveredBridge) -> String,
    ) -> Result<Vec<DiscoveredBridge>> {
        let bridges = self.discover().await?;
        self.add_discovered(bridges, name_for).await
    }

    /// Deletes the bridge's record and drops its session.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown id.
    pub async fn remove(&self, id: RecordId) -> Result<()> {
        self.manager.remove(self.db, id).await
    }

    /// Lists the rooms on a bridge.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown bridge, or any request failure.
    pub async fn get_rooms(&self, bridge_id: RecordId) -> Result<Vec<HueRoom>> {
        self.get(bridge_id).await?.get_rooms().await
    }

    /// Resolves one room on a bridge.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown bridge or room, or any
    /// request failure.
    pub async fn get_room(&self, bridge_id: RecordId, room_id: &str) -> Result<HueRoom> {
        self.get(bridge_id).await?.get_room(room_id).await
    }

    /// Reads the state of one room.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown bridge or room, or any
    /// request failure.
    pub async fn get_room_state(&self, bridge_id: RecordId, room_id: &str) -> Result<HueRoomState> {
        self.get(bridge_id).await?.get_room_state(room_id).await
    }

    /// Applies a partial update to one room and returns its new state.
    ///
    /// # Errors
    ///
    /// See [`HueBridge::set_room_state`].
    pub async fn set_room_state(
        &self,
        bridge_id: RecordId,
        room_id: &str,
        update: &HueRoomStateUpdate,
    ) -> Result<HueRoomState> {
        self.get(bridge_id)
            .await?
            .set_room_state(room_id, update)
            .await
    }
}
