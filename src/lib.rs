// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `homecontrol` - device sessions for a home automation hub.
//!
//! This library presents Midea air conditioners, Broadlink IR blasters and
//! Philips Hue bridges behind one device abstraction: records persisted in a
//! store, live handles cached per device, and per-request services that tie
//! the two together.
//!
//! # Supported Features
//!
//! - **Air conditioners**: state read and write with validation, bounded
//!   retries and the display toggle quirk handled
//! - **Broadlink**: IR learning with a bounded window, playback, stored actions
//! - **Hue**: room level state snapshots and ordered partial updates over
//!   CLIP v2, link button authentication, cloud and mDNS discovery
//!
//! The Midea and Broadlink wire protocols are not implemented here. Hosts
//! plug a binding in through [`aircon::AcConnector`] and
//! [`broadlink::BroadlinkConnector`]. The Hue transport is built in.
//!
//! # Quick Start
//!
//! ```no_run
//! use homecontrol::config::ConfigLoader;
//! use homecontrol::hue::{HueGroupedLightUpdate, HueRoomStateUpdate};
//! use homecontrol::service::HomeControl;
//! use homecontrol::store::InMemoryStore;
//!
//! # async fn example(
//! #     ac: impl homecontrol::aircon::AcConnector,
//! #     broadlink: impl homecontrol::broadlink::BroadlinkConnector,
//! # ) -> homecontrol::Result<()> {
//! let home = HomeControl::from_config(ac, broadlink, &ConfigLoader::new())?;
//! let store = InMemoryStore::new();
//! let hue = home.session(&store).hue();
//!
//! // Press the link button on every bridge first.
//! let pending = hue.discover_and_add_all(|i, _| format!("Bridge{i}")).await?;
//! assert!(pending.is_empty());
//!
//! let bridge = hue.get_by_name("Bridge0").await?;
//! for room in bridge.get_rooms().await? {
//!     let update = HueRoomStateUpdate {
//!         grouped_light: Some(HueGroupedLightUpdate { on: Some(false), brightness: None }),
//!         ..HueRoomStateUpdate::default()
//!     };
//!     bridge.set_room_state(&room.id, &update).await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Errors
//!
//! Every fallible call returns [`Result`]. Transport failures are retried
//! where the operation is safe to repeat; see [`retry`] for the policy.

pub mod aircon;
pub mod broadlink;
pub mod config;
pub mod error;
pub mod hue;
pub mod manager;
pub mod record;
pub mod retry;
pub mod service;
pub mod store;

pub use error::{Error, Result};
pub use record::RecordId;
pub use service::{HomeControl, Session};
