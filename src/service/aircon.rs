// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use crate::aircon::{AcConnector, AcDevice, AcManager, AcState, discover};
use crate::config::{ConfigFile, MideaAccount, MideaConfig};
use crate::error::{ConfigError, Result};
use crate::record::{AcDeviceRecord, RecordId};
use crate::store::{Database, RecordStore};

/// Air conditioner operations for one session.
#[derive(Debug)]
pub struct AcService<'a, C: AcConnector, D> {
    db: &'a D,
    manager: &'a AcManager<C>,
    account: Option<&'a MideaAccount>,
}

impl<'a, C: AcConnector, D: Database> AcService<'a, C, D> {
    pub(crate) fn new(
        db: &'a D,
        manager: &'a AcManager<C>,
        account: Option<&'a MideaAccount>,
    ) -> Self {
        Self {
            db,
            manager,
            account,
        }
    }

    /// Returns the unit with `id`, connecting on first access.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown id, or the connection error.
    pub async fn get(&self, id: RecordId) -> Result<Arc<AcDevice<C::Client>>> {
        self.manager.get(self.db, id).await
    }

    /// Returns the unit called `name`, connecting on first access.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown name, or the connection error.
    pub async fn get_by_name(&self, name: &str) -> Result<Arc<AcDevice<C::Client>>> {
        self.manager.get_by_name(self.db, name).await
    }

    /// Lists every stored unit.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    pub async fn list(&self) -> Result<Vec<AcDeviceRecord>> {
        RecordStore::<AcDeviceRecord>::get_all(self.db).await
    }

    /// Discovers the unit at `ip_address`, stores it as `name` and connects.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Unset`] if no Midea account is configured.
    /// - Discovery errors (not found, missing credentials, connection).
    /// - [`Error::DuplicateEntry`](crate::Error::DuplicateEntry) if the
    ///   name or address is taken.
    pub async fn add(&self, name: &str, ip_address: &str) -> Result<Arc<AcDevice<C::Client>>> {
        let account = self.account.ok_or(ConfigError::Unset {
            file: MideaConfig::FILE_NAME,
        })?;
        let record = discover(self.manager.factory().connector(), name, ip_address, account).await?;
        let record = RecordStore::<AcDeviceRecord>::create(self.db, record).await?;
        tracing::info!(device_id = %record.id, name = %record.name, "Air conditioning unit added");
        self.manager.add(record).await
    }

    /// Deletes the unit's record and drops its session.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown id.
    pub async fn remove(&self, id: RecordId) -> Result<()> {
        self.manager.remove(self.db, id).await
    }

    /// Reads the unit's current state.
    ///
    /// # Errors
    ///
    /// See [`AcDevice::get_state`].
    pub async fn get_state(&self, id: RecordId) -> Result<AcState> {
        self.get(id).await?.get_state().await
    }

    /// Applies a state to the unit.
    ///
    /// # Errors
    ///
    /// See [`AcDevice::set_state`].
    pub async fn set_state(&self, id: RecordId, state: &AcState) -> Result<()> {
        self.get(id).await?.set_state(state).await
    }
}
