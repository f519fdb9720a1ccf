// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Locating Hue bridges.
//!
//! Two methods are supported, as recommended by
//! <https://developers.meethue.com/develop/application-design-guidance/hue-bridge-discovery/>:
//! the cloud endpoint, which lists bridges that recently phoned home from
//! the same public IP, and an mDNS browse on the local network.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HueError, ProtocolError, Result};

use super::mdns;

/// Cloud discovery endpoint.
pub const CLOUD_DISCOVERY_URL: &str = "https://discovery.meethue.com/";

/// How long mDNS discovery collects answers.
pub const MDNS_WINDOW: Duration = Duration::from_secs(5);

/// A bridge found by discovery, not yet authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredBridge {
    /// Bridge id.
    pub id: String,
    /// LAN address.
    pub internalipaddress: String,
    /// HTTPS port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl DiscoveredBridge {
    /// Returns `ip:port`.
    #[must_use]
    pub fn host(&self) -> String {
        format!("{}:{}", self.internalipaddress, self.port)
    }
}

fn default_port() -> u16 {
    443
}

/// Discovers bridges over mDNS or through the cloud endpoint.
///
/// # Errors
///
/// See [`discover_mdns`] and [`discover_cloud`].
pub async fn discover_bridges(use_mdns: bool) -> Result<Vec<DiscoveredBridge>> {
    let bridges = if use_mdns {
        discover_mdns(MDNS_WINDOW).await?
    } else {
        discover_cloud(CLOUD_DISCOVERY_URL).await?
    };
    tracing::info!(count = bridges.len(), mdns = use_mdns, "Hue bridge discovery finished");
    Ok(bridges)
}

/// Browses for `_hue._tcp.local` services for `window` and returns every
/// distinct bridge that answered.
///
/// # Errors
///
/// Returns [`Error::Protocol`](crate::Error::Protocol) if the query cannot
/// be sent.
pub async fn discover_mdns(window: Duration) -> Result<Vec<DiscoveredBridge>> {
    mdns::browse(mdns::HUE_SERVICE, window).await
}

/// Queries the cloud discovery endpoint at `url`.
///
/// # Errors
///
/// - [`HueError::DiscoveryFailed`] when rate limited (HTTP 429).
/// - [`HueError::Api`] for any other HTTP error.
/// - [`Error::Protocol`](crate::Error::Protocol) on transport failure.
pub async fn discover_cloud(url: &str) -> Result<Vec<DiscoveredBridge>> {
    let http = reqwest::Client::builder()
        .timeout(super::client::REQUEST_TIMEOUT)
        .build()
        .map_err(ProtocolError::from)?;
    let response = http.get(url).send().await.map_err(ProtocolError::from)?;

    let status = response.status();
    let reason = status.canonical_reason().unwrap_or("request failed");
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        tracing::warn!(%url, "Hue cloud discovery rate limited");
        return Err(HueError::DiscoveryFailed(reason.to_string()).into());
    }
    if status.as_u16() >= 400 {
        return Err(HueError::Api {
            status: status.as_u16(),
            url: url.to_string(),
            messages: vec![reason.to_string()],
        }
        .into());
    }

    let body = response.bytes().await.map_err(ProtocolError::from)?;
    Ok(serde_json::from_slice(&body)?)
}
