// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Locating an air conditioning unit by IP address.

use crate::config::MideaAccount;
use crate::error::{DeviceKind, Error, NotFoundError, Result};
use crate::record::AcDeviceRecord;
use crate::retry::Operation;

use super::client::AcConnector;

/// Number of probes sent before concluding nothing is at the address.
pub const PROBE_ATTEMPTS: u32 = 3;

/// Probes `ip_address` and returns a record ready to be stored.
///
/// Units often miss a single broadcast, so an empty answer is retried up
/// to [`PROBE_ATTEMPTS`] times. The record is not stored.
///
/// # Errors
///
/// - [`Error::Connection`] if a probe fails outright.
/// - [`Error::NotFound`] if no unit answered any probe.
/// - [`Error::MissingCredentials`] if the unit answered but the cloud did
///   not supply a key and token for it.
pub async fn discover<C: AcConnector>(
    connector: &C,
    name: &str,
    ip_address: &str,
    account: &MideaAccount,
) -> Result<AcDeviceRecord> {
    let mut found = Vec::new();
    for attempt in 1..=PROBE_ATTEMPTS {
        found = match connector.probe(ip_address, account).await {
            Ok(found) => found,
            Err(Error::Protocol(source)) => {
                return Err(Error::Connection {
                    target: ip_address.to_string(),
                    operation: Operation::Discover,
                    attempts: attempt,
                    source,
                });
            }
            Err(e) => return Err(e),
        };
        if !found.is_empty() {
            break;
        }
        tracing::debug!(ip = %ip_address, attempt, "No air conditioning unit answered the probe");
    }

    let Some(unit) = found.into_iter().next() else {
        return Err(NotFoundError::Device {
            kind: DeviceKind::AirConditioner,
            field: "ip_address",
            value: ip_address.to_string(),
        }
        .into());
    };

    let (Some(key), Some(token)) = (unit.key, unit.token) else {
        return Err(Error::MissingCredentials {
            address: ip_address.to_string(),
        });
    };

    tracing::info!(ip = %ip_address, identifier = unit.identifier, "Discovered air conditioning unit");
    Ok(AcDeviceRecord::new(name, ip_address, unit.identifier, key, token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aircon::client::DiscoveredAc;
    use crate::aircon::testing::MockConnector;
    use crate::error::ProtocolError;

    fn account() -> MideaAccount {
        MideaAccount {
            username: "user@example.com".to_string(),
            password: "secret".to_string(),
        }
    }

    fn unit(key: Option<&str>) -> DiscoveredAc {
        DiscoveredAc {
            identifier: 0x1234,
            key: key.map(str::to_string),
            token: Some("token".to_string()),
        }
    }

    #[tokio::test]
    async fn empty_answers_are_retried() {
        let connector =
            MockConnector::answering(vec![Ok(vec![]), Ok(vec![]), Ok(vec![unit(Some("key"))])]);

        let record = discover(&connector, "Bedroom", "192.168.1.5", &account())
            .await
            .unwrap();

        assert_eq!(connector.probe_count(), 3);
        assert_eq!(record.identifier, 0x1234);
        assert_eq!(record.key, "key");
        assert_eq!(record.name, "Bedroom");
    }

    #[tokio::test]
    async fn silence_is_not_found() {
        let connector = MockConnector::answering(vec![]);

        let err = discover(&connector, "Bedroom", "192.168.1.5", &account())
            .await
            .unwrap_err();

        assert_eq!(connector.probe_count(), 3);
        assert_eq!(
            err.to_string(),
            "air conditioning unit with ip_address '192.168.1.5' was not found"
        );
    }

    #[tokio::test]
    async fn missing_key_is_reported() {
        let connector = MockConnector::answering(vec![Ok(vec![unit(None)])]);

        let err = discover(&connector, "Bedroom", "192.168.1.5", &account())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::MissingCredentials { .. }));
    }

    #[tokio::test]
    async fn probe_failure_is_a_connection_error() {
        let connector = MockConnector::answering(vec![Err(
            ProtocolError::Timeout("cloud login".to_string()).into(),
        )]);

        let err = discover(&connector, "Bedroom", "192.168.1.5", &account())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Connection {
                operation: Operation::Discover,
                ..
            }
        ));
        assert_eq!(connector.probe_count(), 1);
    }
}
