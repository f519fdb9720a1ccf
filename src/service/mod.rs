// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-request façades over the device registries.
//!
//! [`HomeControl`] is built once per process and owns one registry per
//! protocol. Each unit of work (an HTTP request, a CLI command) opens a
//! [`Session`] bound to its own store connection; the session hands out
//! protocol services that combine store access with the shared registries.
//!
//! # Examples
//!
//! ```no_run
//! use homecontrol::service::HomeControl;
//! use homecontrol::store::InMemoryStore;
//!
//! # async fn example(
//! #     ac: impl homecontrol::aircon::AcConnector,
//! #     broadlink: impl homecontrol::broadlink::BroadlinkConnector,
//! # ) -> homecontrol::Result<()> {
//! let home = HomeControl::new(ac, broadlink);
//! let store = InMemoryStore::new();
//!
//! let session = home.session(&store);
//! let blaster = session.broadlink().add("Lounge", "192.168.1.40").await?;
//! let action = session.broadlink().record_action(blaster.record().id, "tv power").await?;
//! session.broadlink().play_action(blaster.record().id, action.id).await?;
//! # Ok(())
//! # }
//! ```

mod aircon;
mod broadlink;
mod hue;

pub use aircon::AcService;
pub use broadlink::BroadlinkService;
pub use hue::HueService;

use crate::aircon::{AcConnector, AcHandleFactory, AcManager};
use crate::broadlink::{BroadlinkConnector, BroadlinkHandleFactory, BroadlinkManager};
use crate::config::{ConfigLoader, HueConfig, MideaAccount, MideaConfig};
use crate::error::{ConfigError, Error, Result};
use crate::hue::{HueHandleFactory, HueManager};
use crate::store::Database;

/// Composition root: one registry per protocol plus the loaded configuration.
#[derive(Debug)]
pub struct HomeControl<A: AcConnector, B: BroadlinkConnector> {
    aircon: AcManager<A>,
    broadlink: BroadlinkManager<B>,
    hue: HueManager,
    hue_config: HueConfig,
    midea_account: Option<MideaAccount>,
}

impl<A: AcConnector, B: BroadlinkConnector> HomeControl<A, B> {
    /// Creates registries with default settings and no Midea account.
    #[must_use]
    pub fn new(ac_connector: A, broadlink_connector: B) -> Self {
        Self::with_managers(
            AcManager::new(AcHandleFactory::new(ac_connector)),
            BroadlinkManager::new(BroadlinkHandleFactory::new(broadlink_connector)),
            HueManager::new(HueHandleFactory::default()),
        )
    }

    /// Uses explicitly configured registries.
    #[must_use]
    pub fn with_managers(
        aircon: AcManager<A>,
        broadlink: BroadlinkManager<B>,
        hue: HueManager,
    ) -> Self {
        Self {
            aircon,
            broadlink,
            hue,
            hue_config: HueConfig::default(),
            midea_account: None,
        }
    }

    /// Loads `hue.json` and `midea.json` through `loader`.
    ///
    /// Both files are optional. Without `hue.json` the built-in CA and cloud
    /// discovery are used; without `midea.json` air conditioners can still
    /// be used but not added.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a file exists but cannot be read or
    /// parsed, or if the configured CA certificate cannot be read.
    pub fn from_config(ac_connector: A, broadlink_connector: B, loader: &ConfigLoader) -> Result<Self> {
        let hue_config = optional(loader.load::<HueConfig>())?.unwrap_or_default();
        let midea_account = optional(loader.load::<MideaConfig>())?.map(|config| config.account);

        let hue = HueManager::new(HueHandleFactory::new(hue_config.ca_cert_pem()?));
        let home = Self::with_managers(
            AcManager::new(AcHandleFactory::new(ac_connector)),
            BroadlinkManager::new(BroadlinkHandleFactory::new(broadlink_connector)),
            hue,
        )
        .with_hue_config(hue_config);

        Ok(match midea_account {
            Some(account) => home.with_midea_account(account),
            None => home,
        })
    }

    /// Sets the Hue discovery configuration.
    #[must_use]
    pub fn with_hue_config(mut self, config: HueConfig) -> Self {
        self.hue_config = config;
        self
    }

    /// Sets the Midea account used to discover air conditioners.
    #[must_use]
    pub fn with_midea_account(mut self, account: MideaAccount) -> Self {
        self.midea_account = Some(account);
        self
    }

    /// Returns the air conditioner registry.
    #[must_use]
    pub fn aircon_manager(&self) -> &AcManager<A> {
        &self.aircon
    }

    /// Returns the Broadlink registry.
    #[must_use]
    pub fn broadlink_manager(&self) -> &BroadlinkManager<B> {
        &self.broadlink
    }

    /// Returns the Hue registry.
    #[must_use]
    pub fn hue_manager(&self) -> &HueManager {
        &self.hue
    }

    /// Connects every stored device up front.
    ///
    /// Devices that fail to connect are skipped and retried on first access.
    /// Returns the number of live handles across all protocols.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store cannot list its records.
    pub async fn load_all<D: Database>(&self, db: &D) -> Result<usize> {
        let aircon = self.aircon.load_all(db).await?;
        let broadlink = self.broadlink.load_all(db).await?;
        let hue = self.hue.load_all(db).await?;
        tracing::info!(aircon, broadlink, hue, "Loaded stored devices");
        Ok(aircon + broadlink + hue)
    }

    /// Opens a session bound to `db`.
    #[must_use]
    pub fn session<'a, D: Database>(&'a self, db: &'a D) -> Session<'a, A, B, D> {
        Session { home: self, db }
    }
}

/// Short-lived view of a [`HomeControl`] bound to one store connection.
#[derive(Debug)]
pub struct Session<'a, A: AcConnector, B: BroadlinkConnector, D> {
    home: &'a HomeControl<A, B>,
    db: &'a D,
}

impl<'a, A: AcConnector, B: BroadlinkConnector, D: Database> Session<'a, A, B, D> {
    /// Air conditioner operations.
    #[must_use]
    pub fn aircon(&self) -> AcService<'a, A, D> {
        AcService::new(self.db, &self.home.aircon, self.home.midea_account.as_ref())
    }

    /// Broadlink operations.
    #[must_use]
    pub fn broadlink(&self) -> BroadlinkService<'a, B, D> {
        BroadlinkService::new(self.db, &self.home.broadlink)
    }

    /// Hue operations.
    #[must_use]
    pub fn hue(&self) -> HueService<'a, D> {
        HueService::new(self.db, &self.home.hue, &self.home.hue_config)
    }
}

fn optional<T>(loaded: Result<T>) -> Result<Option<T>> {
    match loaded {
        Ok(value) => Ok(Some(value)),
        Err(Error::Config(ConfigError::NotFound { file, .. })) => {
            tracing::info!(%file, "Optional config file not found");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
