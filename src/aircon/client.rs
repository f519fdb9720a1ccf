// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Seam to the Midea protocol implementation.
//!
//! The wire protocol itself (frame encoding, the v3 handshake, cloud token
//! retrieval) lives in a dedicated binding. This crate only needs the small
//! surface below; implement it over whichever binding the host uses.

use crate::config::MideaAccount;
use crate::error::Result;

use super::state::{AcReading, AcSettings};

/// TCP port Midea units listen on.
pub const MIDEA_PORT: u16 = 6444;

/// A protocol session with one air conditioning unit.
///
/// Every method that talks to the unit may fail with a
/// [`ProtocolError`](crate::ProtocolError); those failures are retried by
/// the caller and must be safe to repeat.
#[allow(async_fn_in_trait)]
pub trait AcClient {
    /// Performs the authentication handshake.
    async fn authenticate(&mut self, key: &str, token: &str) -> Result<()>;

    /// Queries the unit's feature set.
    async fn get_capabilities(&mut self) -> Result<()>;

    /// Reads the current state from the unit into the client.
    async fn refresh(&mut self) -> Result<()>;

    /// Returns the values read by the last refresh.
    fn reading(&self) -> AcReading;

    /// Stages settings to be sent by the next [`apply`](Self::apply).
    fn assign(&mut self, settings: &AcSettings);

    /// Sends the staged settings to the unit.
    async fn apply(&mut self) -> Result<()>;

    /// Flips the front panel display.
    ///
    /// Need not update [`reading`](Self::reading); the device remembers the
    /// flag it toggled to until the next refresh.
    async fn toggle_display(&mut self) -> Result<()>;
}

/// A unit that answered a discovery probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredAc {
    /// Device identifier.
    pub identifier: u64,
    /// Authentication key, if the cloud handed one out.
    pub key: Option<String>,
    /// Authentication token, if the cloud handed one out.
    pub token: Option<String>,
}

/// Opens protocol sessions and probes for units.
#[allow(async_fn_in_trait)]
pub trait AcConnector {
    /// The session type produced.
    type Client: AcClient;

    /// Creates an unauthenticated session for the unit at `ip_address`.
    fn connect(&self, ip_address: &str, identifier: u64, port: u16) -> Self::Client;

    /// Probes `ip_address` once, using `account` to fetch credentials from
    /// the cloud. An empty result means nothing answered.
    async fn probe(&self, ip_address: &str, account: &MideaAccount) -> Result<Vec<DiscoveredAc>>;
}
