// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Room level view of a Hue bridge.
//!
//! The bridge has no single resource describing a room: the room lists its
//! devices, each device lists its light services, the room's grouped light
//! carries the aggregate power and brightness, and scenes point back at the
//! room. [`HueRoomAggregator`] stitches these into a [`HueRoomState`]
//! snapshot and splits a [`HueRoomStateUpdate`] back into per-resource
//! patches.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{HueError, Result};

use super::client::HueClient;
use super::schema::{
    ColorPut, ColorTemperaturePut, DimmingPut, GroupedLightPut, LightGet, LightPut, OnPut,
    RoomGet, SceneActive, ScenePut, Xy,
};

// ============================================================================
// Types
// ============================================================================

/// A light inside a room, named after its device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HueRoomLight {
    /// Name of the owning device.
    pub name: String,
}

/// Structure of a room: which lights it holds and how to address them as one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HueRoom {
    /// Room resource id.
    pub id: String,
    /// Room name.
    pub name: String,
    /// The room's grouped light service, if it has one.
    pub grouped_light_id: Option<String>,
    /// Lights keyed by light resource id.
    pub lights: BTreeMap<String, HueRoomLight>,
}

/// Colour in CIE xy coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HueColour {
    /// x coordinate.
    pub x: f32,
    /// y coordinate.
    pub y: f32,
}

impl From<Xy> for HueColour {
    fn from(xy: Xy) -> Self {
        Self { x: xy.x, y: xy.y }
    }
}

impl From<HueColour> for Xy {
    fn from(colour: HueColour) -> Self {
        Self {
            x: colour.x,
            y: colour.y,
        }
    }
}

/// Aggregate state of every light in a room.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HueGroupedLightState {
    /// True if any light is on. Unknown when the room has no grouped light.
    pub on: Option<bool>,
    /// Average brightness in percent.
    pub brightness: Option<f32>,
}

/// State of one light.
///
/// Optional fields are absent when the hardware lacks the capability, such
/// as a smart plug that can only switch on and off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HueLightState {
    /// Name of the owning device.
    pub name: String,
    /// Power state.
    pub on: bool,
    /// Brightness in percent.
    pub brightness: Option<f32>,
    /// Colour temperature in mirek.
    pub colour_temperature: Option<u16>,
    /// Colour.
    pub colour: Option<HueColour>,
}

/// Whether a scene is currently recalled.
pub type HueSceneStatus = SceneActive;

/// A scene belonging to a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HueSceneState {
    /// Scene name.
    pub name: String,
    /// Activation state.
    pub status: HueSceneStatus,
}

/// Snapshot of everything controllable in a room.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HueRoomState {
    /// Aggregate state.
    pub grouped_light: HueGroupedLightState,
    /// Lights keyed by light resource id.
    pub lights: BTreeMap<String, HueLightState>,
    /// Scenes keyed by scene resource id.
    pub scenes: BTreeMap<String, HueSceneState>,
}

/// Change to the whole room.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HueGroupedLightUpdate {
    /// Switch every light on or off.
    pub on: Option<bool>,
    /// Set every light's brightness.
    pub brightness: Option<f32>,
}

impl HueGroupedLightUpdate {
    fn to_patch(self) -> GroupedLightPut {
        GroupedLightPut {
            on: self.on.map(|on| OnPut { on }),
            dimming: self.brightness.map(|brightness| DimmingPut { brightness }),
        }
    }
}

/// Change to one light. Unset fields are left alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HueLightUpdate {
    /// Power.
    pub on: Option<bool>,
    /// Brightness in percent.
    pub brightness: Option<f32>,
    /// Colour temperature in mirek.
    pub colour_temperature: Option<u16>,
    /// Colour.
    pub colour: Option<HueColour>,
}

impl HueLightUpdate {
    fn to_patch(self) -> LightPut {
        LightPut {
            on: self.on.map(|on| OnPut { on }),
            dimming: self.brightness.map(|brightness| DimmingPut { brightness }),
            color_temperature: self
                .colour_temperature
                .map(|mirek| ColorTemperaturePut { mirek }),
            color: self.colour.map(|colour| ColorPut { xy: colour.into() }),
            dynamics: None,
        }
    }
}

/// Partial change to a room.
///
/// Applied in a fixed order: the grouped light first, then each listed
/// light, then the scene recall. A scene therefore always wins over any
/// per-light change sent in the same update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HueRoomStateUpdate {
    /// Change to the whole room.
    pub grouped_light: Option<HueGroupedLightUpdate>,
    /// Per-light changes keyed by light resource id.
    pub lights: Option<BTreeMap<String, HueLightUpdate>>,
    /// Scene to recall.
    pub scene: Option<String>,
}

// ============================================================================
// Aggregation
// ============================================================================

/// Composes room views from individual CLIP v2 resources.
#[derive(Debug, Clone, Copy)]
pub struct HueRoomAggregator<'a> {
    api: &'a HueClient,
}

impl<'a> HueRoomAggregator<'a> {
    /// Wraps a client.
    #[must_use]
    pub fn new(api: &'a HueClient) -> Self {
        Self { api }
    }

    /// Resolves the structure of one room.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown room id, or any request
    /// failure.
    pub async fn get_room(&self, room_id: &str) -> Result<HueRoom> {
        let room = self.api.get_room(room_id).await?;
        self.resolve(room).await
    }

    /// Resolves the structure of every room on the bridge.
    ///
    /// # Errors
    ///
    /// Returns any request failure.
    pub async fn get_rooms(&self) -> Result<Vec<HueRoom>> {
        let mut rooms = Vec::new();
        for room in self.api.get_rooms().await? {
            rooms.push(self.resolve(room).await?);
        }
        Ok(rooms)
    }

    /// Reads a consistent snapshot of a room.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown room id, or any request
    /// failure.
    pub async fn get_room_state(&self, room_id: &str) -> Result<HueRoomState> {
        let room = self.get_room(room_id).await?;
        self.read_state(&room).await
    }

    /// Applies `update` and returns the room's state afterwards.
    ///
    /// Only the fields set in the update are sent. Nothing is sent for an
    /// update with no fields set.
    ///
    /// # Errors
    ///
    /// - [`HueError::NoGroupedLight`] if a grouped change targets a room
    ///   without a grouped light. Nothing is sent in that case.
    /// - Any request failure. Patches sent before the failure stay applied.
    pub async fn set_room_state(
        &self,
        room_id: &str,
        update: &HueRoomStateUpdate,
    ) -> Result<HueRoomState> {
        let room = self.get_room(room_id).await?;

        let grouped = update
            .grouped_light
            .map(HueGroupedLightUpdate::to_patch)
            .filter(|patch| !patch.is_empty());
        if let Some(patch) = grouped {
            let grouped_light_id =
                room.grouped_light_id
                    .as_deref()
                    .ok_or_else(|| HueError::NoGroupedLight {
                        room_id: room.id.clone(),
                    })?;
            self.api.put_grouped_light(grouped_light_id, &patch).await?;
        }

        for (light_id, change) in update.lights.iter().flatten() {
            let patch = change.to_patch();
            if patch.is_empty() {
                continue;
            }
            self.api.put_light(light_id, &patch).await?;
        }

        if let Some(scene_id) = &update.scene {
            self.api.put_scene(scene_id, &ScenePut::recall()).await?;
        }

        tracing::debug!(room_id = %room.id, "Room state updated");
        self.read_state(&room).await
    }

    async fn resolve(&self, room: RoomGet) -> Result<HueRoom> {
        let grouped_light_id = room
            .services
            .iter()
            .find(|service| service.rtype == "grouped_light")
            .map(|service| service.rid.clone());

        let mut lights = BTreeMap::new();
        for child in room.children.iter().filter(|child| child.rtype == "device") {
            let device = self.api.get_device(&child.rid).await?;
            let name = device
                .metadata
                .and_then(|metadata| metadata.name)
                .unwrap_or_default();
            for service in device.services.iter().filter(|s| s.rtype == "light") {
                lights.insert(service.rid.clone(), HueRoomLight { name: name.clone() });
            }
        }

        Ok(HueRoom {
            id: room.id,
            name: room
                .metadata
                .and_then(|metadata| metadata.name)
                .unwrap_or_default(),
            grouped_light_id,
            lights,
        })
    }

    async fn read_state(&self, room: &HueRoom) -> Result<HueRoomState> {
        let grouped_light = match &room.grouped_light_id {
            Some(id) => {
                let grouped = self.api.get_grouped_light(id).await?;
                HueGroupedLightState {
                    on: grouped.on.map(|on| on.on),
                    brightness: grouped.dimming.map(|dimming| dimming.brightness),
                }
            }
            None => HueGroupedLightState::default(),
        };

        let mut lights = BTreeMap::new();
        for (id, light) in &room.lights {
            let resource = self.api.get_light(id).await?;
            lights.insert(id.clone(), light_state(light.name.clone(), resource));
        }

        let scenes = self
            .api
            .get_scenes()
            .await?
            .into_iter()
            .filter(|scene| scene.group.rid == room.id)
            .map(|scene| {
                let state = HueSceneState {
                    name: scene
                        .metadata
                        .and_then(|metadata| metadata.name)
                        .unwrap_or_default(),
                    status: scene.status.map(|s| s.active).unwrap_or_default(),
                };
                (scene.id, state)
            })
            .collect();

        Ok(HueRoomState {
            grouped_light,
            lights,
            scenes,
        })
    }
}

fn light_state(name: String, light: LightGet) -> HueLightState {
    HueLightState {
        name,
        on: light.on.on,
        brightness: light.dimming.map(|dimming| dimming.brightness),
        colour_temperature: light.color_temperature.and_then(|ct| ct.mirek),
        colour: light.color.map(|color| color.xy.into()),
    }
}
