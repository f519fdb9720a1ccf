// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Caching of live device handles.
//!
//! Connecting to a device is slow and each physical device accepts only a
//! handful of sessions, so every protocol keeps one [`DeviceRegistry`] for
//! the lifetime of the process. Each protocol module defines a
//! [`HandleFactory`] that turns a stored record into a live handle and a
//! type alias naming its registry:
//!
//! - [`AcManager`](crate::aircon::AcManager)
//! - [`BroadlinkManager`](crate::broadlink::BroadlinkManager)
//! - [`HueManager`](crate::hue::HueManager)

mod registry;

pub use registry::{DeviceRegistry, HandleFactory};
