// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use crate::broadlink::{
    BroadlinkConnector, BroadlinkDevice, BroadlinkManager, DiscoveredBroadlink, discover,
    discover_all,
};
use crate::error::Result;
use crate::record::{BroadlinkAction, BroadlinkDeviceRecord, RecordId};
use crate::store::{Database, RecordStore};

/// Broadlink operations for one session.
#[derive(Debug)]
pub struct BroadlinkService<'a, C: BroadlinkConnector, D> {
    db: &'a D,
    manager: &'a BroadlinkManager<C>,
}

impl<'a, C: BroadlinkConnector, D: Database> BroadlinkService<'a, C, D> {
    pub(crate) fn new(db: &'a D, manager: &'a BroadlinkManager<C>) -> Self {
        Self { db, manager }
    }

    /// Returns the device with `id`, connecting on first access.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown id, or the connection error.
    pub async fn get(&self, id: RecordId) -> Result<Arc<BroadlinkDevice<C::Client>>> {
        self.manager.get(self.db, id).await
    }

    /// Returns the device called `name`, connecting on first access.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown name, or the connection error.
    pub async fn get_by_name(&self, name: &str) -> Result<Arc<BroadlinkDevice<C::Client>>> {
        self.manager.get_by_name(self.db, name).await
    }

    /// Lists every stored device.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    pub async fn list(&self) -> Result<Vec<BroadlinkDeviceRecord>> {
        RecordStore::<BroadlinkDeviceRecord>::get_all(self.db).await
    }

    /// Checks that a device answers at `ip_address`, stores it as `name`
    /// and connects.
    ///
    /// # Errors
    ///
    /// - A not-found error if nothing answers.
    /// - [`Error::DuplicateEntry`](crate::Error::DuplicateEntry) if the
    ///   name or address is taken.
    pub async fn add(&self, name: &str, ip_address: &str) -> Result<Arc<BroadlinkDevice<C::Client>>> {
        let found = discover(self.manager.factory().connector(), ip_address).await?;
        let record = BroadlinkDeviceRecord::new(name, found.ip_address);
        let record = RecordStore::<BroadlinkDeviceRecord>::create(self.db, record).await?;
        tracing::info!(device_id = %record.id, name = %record.name, "Broadlink device added");
        self.manager.add(record).await
    }

    /// Deletes the device's record and drops its session.
    ///
    /// Learned actions are not tied to a device and are kept.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown id.
    pub async fn remove(&self, id: RecordId) -> Result<()> {
        self.manager.remove(self.db, id).await
    }

    /// Lists every Broadlink device answering on the local network.
    ///
    /// # Errors
    ///
    /// Returns the connector's error.
    pub async fn discover_all(&self) -> Result<Vec<DiscoveredBroadlink>> {
        discover_all(self.manager.factory().connector()).await
    }

    /// Learns an IR packet on device `device_id` and stores it as `name`.
    ///
    /// # Errors
    ///
    /// - A not-found error for an unknown device.
    /// - [`Error::Validation`](crate::Error::Validation) if the device has no IR.
    /// - [`Error::RecordTimeout`](crate::Error::RecordTimeout) if nothing is learned.
    /// - [`Error::DuplicateEntry`](crate::Error::DuplicateEntry) if the name is taken.
    pub async fn record_action(&self, device_id: RecordId, name: &str) -> Result<BroadlinkAction> {
        let packet = self.get(device_id).await?.record_ir_packet().await?;
        let action = RecordStore::<BroadlinkAction>::create(self.db, BroadlinkAction::new(name, packet)).await?;
        tracing::info!(%device_id, action_id = %action.id, name = %action.name, "Broadlink action recorded");
        Ok(action)
    }

    /// Plays a stored action on device `device_id`.
    ///
    /// # Errors
    ///
    /// - A not-found error for an unknown action or device.
    /// - [`Error::Validation`](crate::Error::Validation) if the device has no IR.
    /// - [`Error::Connection`](crate::Error::Connection) if the send fails.
    pub async fn play_action(&self, device_id: RecordId, action_id: RecordId) -> Result<()> {
        let action = self.get_action(action_id).await?;
        self.get(device_id).await?.send_ir_packet(&action.packet).await?;
        tracing::debug!(%device_id, %action_id, "Broadlink action played");
        Ok(())
    }

    /// Returns a stored action.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown id.
    pub async fn get_action(&self, id: RecordId) -> Result<BroadlinkAction> {
        RecordStore::<BroadlinkAction>::get(self.db, id).await
    }

    /// Returns the stored action called `name`.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown name.
    pub async fn get_action_by_name(&self, name: &str) -> Result<BroadlinkAction> {
        RecordStore::<BroadlinkAction>::get_by_name(self.db, name).await
    }

    /// Lists every stored action.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    pub async fn list_actions(&self) -> Result<Vec<BroadlinkAction>> {
        RecordStore::<BroadlinkAction>::get_all(self.db).await
    }

    /// Deletes a stored action.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown id.
    pub async fn delete_action(&self, id: RecordId) -> Result<()> {
        RecordStore::<BroadlinkAction>::delete(self.db, id).await
    }
}
