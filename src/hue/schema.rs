// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CLIP v2 resource bodies.
//!
//! `*Get` types are read from the bridge and tolerate missing fields, since
//! which sub-objects a resource carries depends on the hardware (a plug has
//! no `dimming`, a white bulb has no `color`). `*Put` and `*Post` types are
//! written to the bridge and omit every unset field: the bridge resets any
//! field it is sent, so a patch must contain exactly what the caller wants
//! changed.

use serde::{Deserialize, Serialize};

// ============================================================================
// Shared
// ============================================================================

/// Reference to another resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    /// Resource id.
    pub rid: String,
    /// Resource type, such as `light` or `device`.
    pub rtype: String,
}

impl ResourceIdentifier {
    /// Creates a reference.
    #[must_use]
    pub fn new(rid: impl Into<String>, rtype: impl Into<String>) -> Self {
        Self {
            rid: rid.into(),
            rtype: rtype.into(),
        }
    }
}

/// CIE xy colour coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Xy {
    /// x coordinate.
    pub x: f32,
    /// y coordinate.
    pub y: f32,
}

/// Display name and icon of a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Icon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archetype: Option<String>,
}

// ============================================================================
// GET
// ============================================================================

/// Power state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnGet {
    /// Whether the light is on.
    pub on: bool,
}

/// Brightness.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimmingGet {
    /// Brightness in percent.
    pub brightness: f32,
    /// Lowest brightness the hardware can produce.
    #[serde(default)]
    pub min_dim_level: Option<f32>,
}

/// Supported colour temperature range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirekSchema {
    /// Coolest supported temperature in mirek.
    pub mirek_minimum: u16,
    /// Warmest supported temperature in mirek.
    pub mirek_maximum: u16,
}

/// Colour temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorTemperatureGet {
    /// Temperature in mirek, absent while the light shows a colour.
    #[serde(default)]
    pub mirek: Option<u16>,
    /// Whether `mirek` reflects the current output.
    #[serde(default)]
    pub mirek_valid: bool,
    /// Supported range.
    #[serde(default)]
    pub mirek_schema: Option<MirekSchema>,
}

/// Colour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorGet {
    /// Current colour.
    pub xy: Xy,
    /// Gamut family.
    #[serde(default)]
    pub gamut_type: Option<String>,
}

/// A `light` resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightGet {
    /// Resource id.
    pub id: String,
    /// Owning device.
    #[serde(default)]
    pub owner: Option<ResourceIdentifier>,
    /// Metadata.
    #[serde(default)]
    pub metadata: Option<Metadata>,
    /// Power state.
    pub on: OnGet,
    /// Brightness, absent for on/off only hardware.
    #[serde(default)]
    pub dimming: Option<DimmingGet>,
    /// Colour temperature, absent for hardware without tunable white.
    #[serde(default)]
    pub color_temperature: Option<ColorTemperatureGet>,
    /// Colour, absent for hardware without colour.
    #[serde(default)]
    pub color: Option<ColorGet>,
}

/// A `grouped_light` resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupedLightGet {
    /// Resource id.
    pub id: String,
    /// Owning room or zone.
    #[serde(default)]
    pub owner: Option<ResourceIdentifier>,
    /// True if any light in the group is on.
    #[serde(default)]
    pub on: Option<OnGet>,
    /// Average brightness of the group.
    #[serde(default)]
    pub dimming: Option<DimmingGet>,
}

/// A `device` resource: one physical product exposing services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceGet {
    /// Resource id.
    pub id: String,
    /// Metadata.
    #[serde(default)]
    pub metadata: Option<Metadata>,
    /// Services provided by the device.
    #[serde(default)]
    pub services: Vec<ResourceIdentifier>,
}

/// A `room` resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomGet {
    /// Resource id.
    pub id: String,
    /// Metadata.
    #[serde(default)]
    pub metadata: Option<Metadata>,
    /// Devices in the room.
    #[serde(default)]
    pub children: Vec<ResourceIdentifier>,
    /// Services of the room itself, such as its `grouped_light`.
    #[serde(default)]
    pub services: Vec<ResourceIdentifier>,
}

/// Activation state of a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneActive {
    /// Not active.
    #[default]
    Inactive,
    /// Recalled as a static scene.
    Static,
    /// Playing its palette dynamically.
    DynamicPalette,
}

/// Scene status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneStatus {
    /// Activation state.
    #[serde(default)]
    pub active: SceneActive,
}

/// A `scene` resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneGet {
    /// Resource id.
    pub id: String,
    /// Metadata.
    #[serde(default)]
    pub metadata: Option<Metadata>,
    /// Room or zone the scene belongs to.
    pub group: ResourceIdentifier,
    /// Status, missing on older firmware.
    #[serde(default)]
    pub status: Option<SceneStatus>,
}

// ============================================================================
// PUT / POST
// ============================================================================

/// Power change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnPut {
    /// Target power state.
    pub on: bool,
}

/// Brightness change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimmingPut {
    /// Target brightness in percent.
    pub brightness: f32,
}

/// Colour temperature change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorTemperaturePut {
    /// Target temperature in mirek.
    pub mirek: u16,
}

/// Colour change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorPut {
    /// Target colour.
    pub xy: Xy,
}

/// Transition settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DynamicsPut {
    /// Transition duration in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
}

/// Patch for a `light` resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightPut {
    /// Power.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on: Option<OnPut>,
    /// Brightness.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimming: Option<DimmingPut>,
    /// Colour temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_temperature: Option<ColorTemperaturePut>,
    /// Colour.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<ColorPut>,
    /// Transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dynamics: Option<DynamicsPut>,
}

impl LightPut {
    /// Returns true if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Patch for a `grouped_light` resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupedLightPut {
    /// Power of every light in the group.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on: Option<OnPut>,
    /// Brightness of every light in the group.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimming: Option<DimmingPut>,
}

impl GroupedLightPut {
    /// Returns true if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.on.is_none() && self.dimming.is_none()
    }
}

/// Scene recall request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recall {
    /// Either `active`, `dynamic_palette` or `static`.
    pub action: String,
}

impl Recall {
    /// Recall as the scene's default activation.
    #[must_use]
    pub fn active() -> Self {
        Self {
            action: "active".to_string(),
        }
    }
}

/// Patch for a `scene` resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenePut {
    /// Rename.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    /// Recall request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recall: Option<Recall>,
}

impl ScenePut {
    /// A patch that recalls the scene.
    #[must_use]
    pub fn recall() -> Self {
        Self {
            recall: Some(Recall::active()),
            ..Self::default()
        }
    }
}

/// One light setting stored in a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneAction {
    /// The light.
    pub target: ResourceIdentifier,
    /// Its setting.
    pub action: LightPut,
}

/// Body for creating a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenePost {
    /// Name of the scene.
    pub metadata: Metadata,
    /// Room or zone the scene belongs to.
    pub group: ResourceIdentifier,
    /// Per-light settings.
    pub actions: Vec<SceneAction>,
}

/// Patch for a `room` resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomPut {
    /// Rename or change icon.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    /// Replace the room's devices.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ResourceIdentifier>>,
}

/// Body for creating a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomPost {
    /// Name and icon.
    pub metadata: Metadata,
    /// Devices in the room.
    pub children: Vec<ResourceIdentifier>,
}

// ============================================================================
// Envelopes
// ============================================================================

/// An error description inside a CLIP v2 response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct ApiErrorDescription {
    pub description: String,
}

/// Every CLIP v2 response: errors plus data.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub(crate) struct Envelope<T> {
    #[serde(default)]
    pub errors: Vec<ApiErrorDescription>,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// Credentials issued by `POST /api`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct IssuedKey {
    pub username: String,
    pub clientkey: String,
}

/// Error entry in a `POST /api` reply.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct LegacyError {
    #[serde(rename = "type")]
    pub kind: u16,
    #[serde(default)]
    pub description: String,
}

/// One entry of the list returned by `POST /api`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum KeyReply {
    Success(IssuedKey),
    Error(LegacyError),
}

/// Body of `POST /api`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct KeyRequest<'a> {
    pub devicetype: &'a str,
    pub generateclientkey: bool,
}
