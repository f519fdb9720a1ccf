// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Seam to the Broadlink protocol implementation.

use crate::error::Result;

/// A protocol session with one Broadlink device.
#[allow(async_fn_in_trait)]
pub trait BroadlinkClient {
    /// Returns true if the device has an IR transmitter.
    fn supports_ir(&self) -> bool;

    /// Performs the authentication handshake.
    async fn auth(&mut self) -> Result<()>;

    /// Puts the device into IR learning mode.
    async fn enter_learning(&mut self) -> Result<()>;

    /// Returns the learned packet, or `None` if nothing has been captured
    /// yet. Some firmware reports "no data" as a
    /// [`ProtocolError`](crate::ProtocolError) instead; callers polling
    /// this treat both the same.
    async fn check_data(&mut self) -> Result<Option<Vec<u8>>>;

    /// Transmits a raw IR packet.
    async fn send_data(&mut self, packet: &[u8]) -> Result<()>;
}

/// A device that answered a discovery request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredBroadlink {
    /// Address the device answered from.
    pub ip_address: String,
}

/// Opens sessions with Broadlink devices.
#[allow(async_fn_in_trait)]
pub trait BroadlinkConnector {
    /// The session type produced.
    type Client: BroadlinkClient;

    /// Contacts the device at `ip_address` and returns an unauthenticated
    /// session.
    ///
    /// # Errors
    ///
    /// Must return [`ProtocolError::Timeout`](crate::ProtocolError::Timeout)
    /// when nothing answers.
    async fn hello(&self, ip_address: &str) -> Result<Self::Client>;

    /// Broadcasts a discovery request on the local network.
    async fn discover_all(&self) -> Result<Vec<DiscoveredBroadlink>>;
}
