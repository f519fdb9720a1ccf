// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `homecontrol` library.
//!
//! Every error that concerns a device carries the identifier of the device
//! (record id, bridge address or IP address) and the operation that was
//! being attempted. The devices are physically remote and their Wi-Fi stacks
//! are flaky, so failures are routine and the operator needs to know which
//! unit misbehaved.
//!
//! Only [`ProtocolError`]s are considered transient. The retry machinery in
//! [`crate::retry`] retries those and wraps the last one in
//! [`Error::Connection`] or [`Error::Authentication`] once attempts are
//! exhausted. Everything else propagates immediately.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::retry::Operation;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// A request was rejected locally before any device I/O.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A record or remote resource does not exist.
    #[error("{0}")]
    NotFound(#[from] NotFoundError),

    /// A record with the same unique key is already stored.
    #[error("duplicate entry: {entity} with {field} '{value}' already exists")]
    DuplicateEntry {
        /// The kind of record.
        entity: &'static str,
        /// The unique field that clashed.
        field: &'static str,
        /// The clashing value.
        value: String,
    },

    /// A transient transport failure that has not (yet) been retried.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A network round trip kept failing until the retry budget ran out.
    #[error("connection to {target} failed during {operation} after {attempts} attempt(s): {source}")]
    Connection {
        /// The device the operation targeted.
        target: String,
        /// The operation that failed.
        operation: Operation,
        /// How many attempts were made.
        attempts: u32,
        /// The last transport failure.
        #[source]
        source: ProtocolError,
    },

    /// The authentication handshake kept failing until the retry budget ran out.
    #[error("failed to authenticate with {target} after {attempts} attempt(s): {source}")]
    Authentication {
        /// The device that rejected the handshake.
        target: String,
        /// How many attempts were made.
        attempts: u32,
        /// The last transport failure.
        #[source]
        source: ProtocolError,
    },

    /// Discovery found the device but it did not hand out credentials.
    #[error("unable to obtain authentication data for the device at '{address}'")]
    MissingCredentials {
        /// The probed address.
        address: String,
    },

    /// No IR packet arrived during the learning window.
    #[error("timed out after {window:?} waiting for an IR packet on device {device_id}")]
    RecordTimeout {
        /// The learning device.
        device_id: String,
        /// The length of the learning window.
        window: Duration,
    },

    /// A device reported a value this library has no mapping for.
    #[error("device {device_id} reported unrecognised {field} code {code}")]
    UnexpectedReading {
        /// The reporting device.
        device_id: String,
        /// The field holding the unknown code.
        field: &'static str,
        /// The raw code.
        code: u8,
    },

    /// Philips Hue specific failure.
    #[error("hue error: {0}")]
    Hue(#[from] HueError),

    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A response body could not be decoded.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns true if the failure is worth retrying.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }

    /// Returns true if this is any kind of not-found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Errors raised by local validation. These are never retried.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// The requested air conditioner state is not allowed.
    #[error("invalid state for air conditioning unit {device_id}: {reason}")]
    InvalidState {
        /// The targeted unit.
        device_id: String,
        /// What is wrong with the state.
        reason: String,
    },

    /// The device cannot perform the requested operation.
    #[error("device {device_id} does not support {operation}")]
    IncompatibleDevice {
        /// The targeted device.
        device_id: String,
        /// The operation that was refused.
        operation: Operation,
    },
}

/// The kinds of physical device this library manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// A Midea air conditioning unit.
    AirConditioner,
    /// A Broadlink IR blaster.
    Broadlink,
    /// A Philips Hue bridge.
    HueBridge,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AirConditioner => write!(f, "air conditioning unit"),
            Self::Broadlink => write!(f, "Broadlink device"),
            Self::HueBridge => write!(f, "Hue bridge"),
        }
    }
}

/// Something looked up by id or name does not exist.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotFoundError {
    /// A device record, or a physical device that did not answer a probe.
    #[error("{kind} with {field} '{value}' was not found")]
    Device {
        /// The kind of device.
        kind: DeviceKind,
        /// The field used for the lookup.
        field: &'static str,
        /// The value looked up.
        value: String,
    },

    /// A stored Broadlink action.
    #[error("Broadlink action with {field} '{value}' was not found")]
    Action {
        /// The field used for the lookup.
        field: &'static str,
        /// The value looked up.
        value: String,
    },

    /// Any other entry, such as a Hue bridge resource.
    #[error("{entity} with {field} '{value}' was not found")]
    Entry {
        /// The kind of entry.
        entity: String,
        /// The field used for the lookup.
        field: &'static str,
        /// The value looked up.
        value: String,
    },
}

/// Transport level failures. These are the only retried errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Socket level failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The device did not answer in time.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The vendor client reported a failure.
    #[error("device reported an error: {0}")]
    Device(String),
}

/// Errors specific to the Philips Hue bridge.
#[derive(Debug, Error)]
pub enum HueError {
    /// The link button must be pressed before a key can be issued.
    #[error("press the link button on the Hue bridge at '{address}' and try again")]
    ButtonNotPressed {
        /// The bridge address.
        address: String,
    },

    /// The bridge answered the key request with something unrecognised.
    #[error("unexpected authentication response from the Hue bridge at '{address}': {body}")]
    UnexpectedAuthResponse {
        /// The bridge address.
        address: String,
        /// The raw response.
        body: String,
    },

    /// Bridge discovery failed, typically due to rate limiting.
    #[error("Hue bridge discovery failed: {0}")]
    DiscoveryFailed(String),

    /// The bridge rejected a request.
    #[error("{status} error for url {url}: {}", messages.join("; "))]
    Api {
        /// HTTP status code.
        status: u16,
        /// The request URL.
        url: String,
        /// Error descriptions reported by the bridge.
        messages: Vec<String>,
    },

    /// The room has no grouped light service to address.
    #[error("room '{room_id}' has no grouped light service")]
    NoGroupedLight {
        /// The room.
        room_id: String,
    },

    /// The application key cannot be used as a header value.
    #[error("invalid application key for the Hue bridge at '{address}'")]
    InvalidApplicationKey {
        /// The bridge address.
        address: String,
    },
}

/// Errors raised while loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file does not exist in any of the search locations.
    #[error("config file '{file}' not found, searched: {}", searched.join(", "))]
    NotFound {
        /// The file name.
        file: String,
        /// Every location that was searched.
        searched: Vec<String>,
    },

    /// An operation needs a file that was not loaded at startup.
    #[error("'{file}' is required for this operation but was not loaded")]
    Unset {
        /// The file name.
        file: &'static str,
    },

    /// The file could not be read.
    #[error("failed to read '{path}': {source}")]
    Read {
        /// The file path.
        path: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file could not be written.
    #[error("failed to write '{path}': {source}")]
    Write {
        /// The file path.
        path: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON for the expected shape.
    #[error("failed to parse '{path}': {source}")]
    Parse {
        /// The file path.
        path: String,
        /// The underlying error.
        #[source]
        source: serde_json::Error,
    },
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display_names_the_lookup() {
        let err = NotFoundError::Device {
            kind: DeviceKind::AirConditioner,
            field: "id",
            value: "abc".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "air conditioning unit with id 'abc' was not found"
        );
    }

    #[test]
    fn connection_error_names_target_and_operation() {
        let err = Error::Connection {
            target: "1234".to_string(),
            operation: Operation::Apply,
            attempts: 3,
            source: ProtocolError::Timeout("no reply".to_string()),
        };
        let message = err.to_string();
        assert!(message.contains("1234"));
        assert!(message.contains("apply"));
        assert!(message.contains("3 attempt"));
    }

    #[test]
    fn only_protocol_errors_are_transient() {
        let transient: Error = ProtocolError::Device("UnboundLocalError".to_string()).into();
        assert!(transient.is_transient());

        let validation: Error = ValidationError::InvalidState {
            device_id: "x".to_string(),
            reason: "bad".to_string(),
        }
        .into();
        assert!(!validation.is_transient());

        let missing: Error = NotFoundError::Action {
            field: "id",
            value: "y".to_string(),
        }
        .into();
        assert!(!missing.is_transient());
        assert!(missing.is_not_found());
    }

    #[test]
    fn hue_api_error_joins_messages() {
        let err = HueError::Api {
            status: 404,
            url: "https://bridge/clip/v2/resource/light/x".to_string(),
            messages: vec!["not found".to_string(), "really".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "404 error for url https://bridge/clip/v2/resource/light/x: not found; really"
        );
    }

    #[test]
    fn config_not_found_lists_search_paths() {
        let err = ConfigError::NotFound {
            file: "hue.json".to_string(),
            searched: vec!["/a/hue.json".to_string(), "/b/hue.json".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "config file 'hue.json' not found, searched: /a/hue.json, /b/hue.json"
        );
    }
}
