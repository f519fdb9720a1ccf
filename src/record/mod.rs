// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Persisted records.
//!
//! A record is the durable half of a device: the information needed to
//! reconnect to it after a restart. Records are created by discovery plus a
//! successful authentication and are deleted explicitly. Within a record
//! kind, `name` is unique and so is the network address where the kind has
//! one.
//!
//! The live half, the open client session, is a handle owned by a
//! [`DeviceRegistry`](crate::manager::DeviceRegistry).

mod id;

pub use id::RecordId;

use serde::{Deserialize, Serialize};

use crate::error::{DeviceKind, NotFoundError};

/// Common behaviour of every persisted record kind.
pub trait Record: Clone + Send + Sync + 'static {
    /// Human readable entity name used in error messages.
    const ENTITY: &'static str;

    /// Primary key.
    fn id(&self) -> RecordId;

    /// Unique display name.
    fn name(&self) -> &str;

    /// Unique network address, if this kind of record has one.
    fn address(&self) -> Option<&str> {
        None
    }

    /// Builds the not-found error for a failed lookup of this kind.
    fn not_found(field: &'static str, value: impl Into<String>) -> NotFoundError;
}

// ============================================================================
// Device records
// ============================================================================

/// A registered Midea air conditioning unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcDeviceRecord {
    /// Primary key.
    pub id: RecordId,
    /// Unique display name.
    pub name: String,
    /// Unique IP address.
    pub ip_address: String,
    /// Device identifier reported by the unit during discovery.
    pub identifier: u64,
    /// Authentication key obtained from the cloud during discovery.
    pub key: String,
    /// Authentication token obtained from the cloud during discovery.
    pub token: String,
}

impl AcDeviceRecord {
    /// Creates a record with a fresh id.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        ip_address: impl Into<String>,
        identifier: u64,
        key: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            id: RecordId::new(),
            name: name.into(),
            ip_address: ip_address.into(),
            identifier,
            key: key.into(),
            token: token.into(),
        }
    }
}

impl Record for AcDeviceRecord {
    const ENTITY: &'static str = "air conditioning unit";

    fn id(&self) -> RecordId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn address(&self) -> Option<&str> {
        Some(&self.ip_address)
    }

    fn not_found(field: &'static str, value: impl Into<String>) -> NotFoundError {
        NotFoundError::Device {
            kind: DeviceKind::AirConditioner,
            field,
            value: value.into(),
        }
    }
}

/// A registered Broadlink IR blaster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadlinkDeviceRecord {
    /// Primary key.
    pub id: RecordId,
    /// Unique display name.
    pub name: String,
    /// Unique IP address.
    pub ip_address: String,
}

impl BroadlinkDeviceRecord {
    /// Creates a record with a fresh id.
    #[must_use]
    pub fn new(name: impl Into<String>, ip_address: impl Into<String>) -> Self {
        Self {
            id: RecordId::new(),
            name: name.into(),
            ip_address: ip_address.into(),
        }
    }
}

impl Record for BroadlinkDeviceRecord {
    const ENTITY: &'static str = "Broadlink device";

    fn id(&self) -> RecordId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn address(&self) -> Option<&str> {
        Some(&self.ip_address)
    }

    fn not_found(field: &'static str, value: impl Into<String>) -> NotFoundError {
        NotFoundError::Device {
            kind: DeviceKind::Broadlink,
            field,
            value: value.into(),
        }
    }
}

/// A registered Philips Hue bridge and the credentials it issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HueBridgeRecord {
    /// Primary key.
    pub id: RecordId,
    /// Unique display name.
    pub name: String,
    /// Unique IP address.
    pub ip_address: String,
    /// HTTPS port, normally 443.
    pub port: u16,
    /// Bridge id as reported by discovery.
    pub identifier: String,
    /// Application key sent in the `hue-application-key` header.
    pub username: String,
    /// Entertainment client key.
    pub client_key: String,
}

impl HueBridgeRecord {
    /// Returns `ip:port`, the address the bridge is reached on.
    #[must_use]
    pub fn host(&self) -> String {
        format!("{}:{}", self.ip_address, self.port)
    }
}

impl Record for HueBridgeRecord {
    const ENTITY: &'static str = "Hue bridge";

    fn id(&self) -> RecordId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn address(&self) -> Option<&str> {
        Some(&self.ip_address)
    }

    fn not_found(field: &'static str, value: impl Into<String>) -> NotFoundError {
        NotFoundError::Device {
            kind: DeviceKind::HueBridge,
            field,
            value: value.into(),
        }
    }
}

// ============================================================================
// Broadlink actions
// ============================================================================

/// A learned IR packet stored under a unique name.
///
/// Actions are immutable once learned; to change one, delete it and learn
/// it again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadlinkAction {
    /// Primary key.
    pub id: RecordId,
    /// Unique display name.
    pub name: String,
    /// The raw IR packet.
    pub packet: Vec<u8>,
}

impl BroadlinkAction {
    /// Creates an action with a fresh id.
    #[must_use]
    pub fn new(name: impl Into<String>, packet: Vec<u8>) -> Self {
        Self {
            id: RecordId::new(),
            name: name.into(),
            packet,
        }
    }
}

impl Record for BroadlinkAction {
    const ENTITY: &'static str = "Broadlink action";

    fn id(&self) -> RecordId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn not_found(field: &'static str, value: impl Into<String>) -> NotFoundError {
        NotFoundError::Action {
            field,
            value: value.into(),
        }
    }
}
