// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Locating Broadlink devices.

use crate::error::{DeviceKind, Error, NotFoundError, ProtocolError, Result};
use crate::retry::Operation;

use super::client::{BroadlinkConnector, DiscoveredBroadlink};

/// Checks that a Broadlink device answers at `ip_address`.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if nothing answers before the connector's
/// timeout, or [`Error::Connection`] for any other transport failure.
pub async fn discover<C: BroadlinkConnector>(
    connector: &C,
    ip_address: &str,
) -> Result<DiscoveredBroadlink> {
    match connector.hello(ip_address).await {
        Ok(_) => {
            tracing::info!(ip = %ip_address, "Discovered Broadlink device");
            Ok(DiscoveredBroadlink {
                ip_address: ip_address.to_string(),
            })
        }
        Err(Error::Protocol(ProtocolError::Timeout(_))) => Err(NotFoundError::Device {
            kind: DeviceKind::Broadlink,
            field: "ip_address",
            value: ip_address.to_string(),
        }
        .into()),
        Err(Error::Protocol(source)) => Err(Error::Connection {
            target: ip_address.to_string(),
            operation: Operation::Discover,
            attempts: 1,
            source,
        }),
        Err(e) => Err(e),
    }
}

/// Broadcasts for every Broadlink device on the local network.
///
/// # Errors
///
/// Returns the connector's error if the broadcast cannot be sent.
pub async fn discover_all<C: BroadlinkConnector>(connector: &C) -> Result<Vec<DiscoveredBroadlink>> {
    let found = connector.discover_all().await?;
    tracing::info!(count = found.len(), "Broadlink discovery finished");
    Ok(found)
}
