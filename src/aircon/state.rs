// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Air conditioner state and the protocol codes behind it.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, ValidationError};

/// Lowest target temperature the units accept, in °C.
pub const MIN_TARGET_TEMPERATURE: f32 = 16.0;

/// Highest target temperature the units accept, in °C.
pub const MAX_TARGET_TEMPERATURE: f32 = 30.0;

// ============================================================================
// Protocol enumerations
// ============================================================================

/// Operational mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcMode {
    /// Unit picks heating or cooling.
    Auto,
    /// Cooling.
    Cool,
    /// Dehumidify.
    Dry,
    /// Heating.
    Heat,
    /// Fan only.
    Fan,
}

impl AcMode {
    /// Returns the protocol code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Auto => 1,
            Self::Cool => 2,
            Self::Dry => 3,
            Self::Heat => 4,
            Self::Fan => 5,
        }
    }

    /// Parses a protocol code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Auto),
            2 => Some(Self::Cool),
            3 => Some(Self::Dry),
            4 => Some(Self::Heat),
            5 => Some(Self::Fan),
            _ => None,
        }
    }
}

/// Fan speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanSpeed {
    /// Unit-controlled speed.
    #[default]
    Auto,
    /// Highest speed.
    Full,
    /// Medium speed.
    Medium,
    /// Low speed.
    Low,
    /// Quietest speed.
    Silent,
}

impl FanSpeed {
    /// Returns the protocol code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Auto => 102,
            Self::Full => 100,
            Self::Medium => 80,
            Self::Low => 40,
            Self::Silent => 20,
        }
    }

    /// Parses a protocol code.
    ///
    /// Units report intermediate speeds set from their own remotes; any
    /// code without a mapping reads as [`FanSpeed::Auto`].
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        match code {
            100 => Self::Full,
            80 => Self::Medium,
            40 => Self::Low,
            20 => Self::Silent,
            _ => Self::Auto,
        }
    }
}

/// Louvre swing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwingMode {
    /// No swing.
    #[default]
    Off,
    /// Up and down.
    Vertical,
    /// Side to side.
    Horizontal,
    /// Both axes.
    Both,
}

impl SwingMode {
    /// Returns the protocol code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Off => 0x0,
            Self::Vertical => 0xC,
            Self::Horizontal => 0x3,
            Self::Both => 0xF,
        }
    }

    /// Parses a protocol code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0x0 => Some(Self::Off),
            0xC => Some(Self::Vertical),
            0x3 => Some(Self::Horizontal),
            0xF => Some(Self::Both),
            _ => None,
        }
    }
}

// ============================================================================
// State
// ============================================================================

/// Complete state of an air conditioning unit.
///
/// Read from the device on every [`get_state`](super::AcDevice::get_state);
/// never cached. When passed to [`set_state`](super::AcDevice::set_state),
/// the temperature readings are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcState {
    /// Whether the unit is running.
    pub power: bool,
    /// Target temperature in °C, between 16 and 30 inclusive.
    pub target_temperature: f32,
    /// Operational mode.
    pub mode: AcMode,
    /// Fan speed.
    pub fan_speed: FanSpeed,
    /// Louvre swing.
    pub swing_mode: SwingMode,
    /// Eco mode. Cannot be combined with turbo.
    pub eco_mode: bool,
    /// Turbo mode. Cannot be combined with eco.
    pub turbo_mode: bool,
    /// Whether the unit displays Fahrenheit.
    pub fahrenheit: bool,
    /// Whether the front panel display is lit.
    pub display_on: bool,
    /// Indoor temperature in °C. Read only.
    pub indoor_temperature: f32,
    /// Outdoor temperature in °C. Read only.
    pub outdoor_temperature: f32,
    /// Whether the unit beeps on accepting a command. Write only; reads
    /// always report `false`.
    #[serde(default)]
    pub prompt_tone: bool,
}

impl AcState {
    /// Checks the state can be sent to a unit.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidState`] if eco and turbo are both
    /// set or the target temperature is outside 16–30 °C.
    pub fn validate(&self, device_id: &str) -> std::result::Result<(), ValidationError> {
        let invalid = |reason: String| ValidationError::InvalidState {
            device_id: device_id.to_string(),
            reason,
        };

        if self.eco_mode && self.turbo_mode {
            return Err(invalid(
                "cannot have both 'eco_mode' and 'turbo_mode' set at the same time".to_string(),
            ));
        }
        if !(MIN_TARGET_TEMPERATURE..=MAX_TARGET_TEMPERATURE).contains(&self.target_temperature) {
            return Err(invalid(format!(
                "'target_temperature' of {} must be between {MIN_TARGET_TEMPERATURE} and {MAX_TARGET_TEMPERATURE}",
                self.target_temperature
            )));
        }
        Ok(())
    }
}

/// Raw values last read from a unit, as the protocol client reports them.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AcReading {
    /// Power flag.
    pub power: bool,
    /// Target temperature in °C.
    pub target_temperature: f32,
    /// Operational mode code.
    pub mode: u8,
    /// Fan speed code.
    pub fan_speed: u8,
    /// Swing mode code.
    pub swing_mode: u8,
    /// Eco flag.
    pub eco_mode: bool,
    /// Turbo flag.
    pub turbo_mode: bool,
    /// Fahrenheit flag.
    pub fahrenheit: bool,
    /// Display flag.
    pub display_on: bool,
    /// Indoor temperature in °C.
    pub indoor_temperature: f32,
    /// Outdoor temperature in °C.
    pub outdoor_temperature: f32,
}

impl AcReading {
    /// Returns true for the all-zero sensor reading some units produce
    /// right after waking up.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_false_zero(&self) -> bool {
        self.indoor_temperature == 0.0 && self.outdoor_temperature == 0.0
    }

    /// Decodes the raw codes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedReading`] for a mode or swing code with no
    /// mapping. Unknown fan speeds read as [`FanSpeed::Auto`].
    pub fn decode(&self, device_id: &str) -> Result<AcState> {
        let unexpected = |field, code| Error::UnexpectedReading {
            device_id: device_id.to_string(),
            field,
            code,
        };

        Ok(AcState {
            power: self.power,
            target_temperature: self.target_temperature,
            mode: AcMode::from_code(self.mode).ok_or_else(|| unexpected("mode", self.mode))?,
            fan_speed: FanSpeed::from_code(self.fan_speed),
            swing_mode: SwingMode::from_code(self.swing_mode)
                .ok_or_else(|| unexpected("swing_mode", self.swing_mode))?,
            eco_mode: self.eco_mode,
            turbo_mode: self.turbo_mode,
            fahrenheit: self.fahrenheit,
            display_on: self.display_on,
            indoor_temperature: self.indoor_temperature,
            outdoor_temperature: self.outdoor_temperature,
            prompt_tone: false,
        })
    }
}

/// The writable fields of a state, ready to hand to a protocol client.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcSettings {
    /// Power flag.
    pub power: bool,
    /// Target temperature in °C.
    pub target_temperature: f32,
    /// Operational mode.
    pub mode: AcMode,
    /// Fan speed.
    pub fan_speed: FanSpeed,
    /// Swing mode.
    pub swing_mode: SwingMode,
    /// Eco flag.
    pub eco_mode: bool,
    /// Turbo flag.
    pub turbo_mode: bool,
    /// Fahrenheit flag.
    pub fahrenheit: bool,
    /// Beep on accept.
    pub prompt_tone: bool,
}

impl From<&AcState> for AcSettings {
    fn from(state: &AcState) -> Self {
        Self {
            power: state.power,
            target_temperature: state.target_temperature,
            mode: state.mode,
            fan_speed: state.fan_speed,
            swing_mode: state.swing_mode,
            eco_mode: state.eco_mode,
            turbo_mode: state.turbo_mode,
            fahrenheit: state.fahrenheit,
            prompt_tone: state.prompt_tone,
        }
    }
}

/// What has to be sent to move a unit to a requested state.
///
/// The display is not part of the regular settings frame: it can only be
/// flipped with a separate toggle command, so the transition records
/// whether that command is needed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcTransition {
    /// Settings assigned before apply.
    pub settings: AcSettings,
    /// Whether the display must be toggled after apply.
    pub toggle_display: bool,
}

impl AcTransition {
    /// Computes the transition from a unit whose display is currently
    /// `display_on` to `requested`.
    #[must_use]
    pub fn new(display_on: bool, requested: &AcState) -> Self {
        Self {
            settings: AcSettings::from(requested),
            toggle_display: display_on != requested.display_on,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> AcState {
        AcState {
            power: true,
            target_temperature: 21.0,
            mode: AcMode::Cool,
            fan_speed: FanSpeed::Medium,
            swing_mode: SwingMode::Off,
            eco_mode: false,
            turbo_mode: false,
            fahrenheit: false,
            display_on: true,
            indoor_temperature: 24.0,
            outdoor_temperature: 18.5,
            prompt_tone: false,
        }
    }

    #[test]
    fn mode_codes_round_trip() {
        for mode in [AcMode::Auto, AcMode::Cool, AcMode::Dry, AcMode::Heat, AcMode::Fan] {
            assert_eq!(AcMode::from_code(mode.code()), Some(mode));
        }
        assert_eq!(AcMode::from_code(0), None);
    }

    #[test]
    fn unknown_fan_speed_reads_as_auto() {
        assert_eq!(FanSpeed::from_code(100), FanSpeed::Full);
        assert_eq!(FanSpeed::from_code(60), FanSpeed::Auto);
        assert_eq!(FanSpeed::from_code(102), FanSpeed::Auto);
    }

    #[test]
    fn swing_codes_match_protocol() {
        assert_eq!(SwingMode::Vertical.code(), 0xC);
        assert_eq!(SwingMode::Horizontal.code(), 0x3);
        assert_eq!(SwingMode::from_code(0xF), Some(SwingMode::Both));
        assert_eq!(SwingMode::from_code(0x1), None);
    }

    #[test]
    fn validate_accepts_bounds() {
        let mut state = sample_state();
        state.target_temperature = 16.0;
        assert!(state.validate("ac").is_ok());
        state.target_temperature = 30.0;
        assert!(state.validate("ac").is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_temperature() {
        for temperature in [15.5, 30.5, -4.0, f32::NAN] {
            let mut state = sample_state();
            state.target_temperature = temperature;
            assert!(state.validate("ac").is_err(), "{temperature} accepted");
        }
    }

    #[test]
    fn validate_rejects_eco_with_turbo() {
        let mut state = sample_state();
        state.eco_mode = true;
        state.turbo_mode = true;
        let err = state.validate("ac-7").unwrap_err();
        assert!(err.to_string().contains("ac-7"));
        assert!(err.to_string().contains("eco_mode"));
    }

    #[test]
    fn decode_maps_codes() {
        let reading = AcReading {
            power: true,
            target_temperature: 22.0,
            mode: 4,
            fan_speed: 55,
            swing_mode: 0xC,
            display_on: true,
            indoor_temperature: 19.0,
            outdoor_temperature: 7.0,
            ..AcReading::default()
        };
        let state = reading.decode("ac").unwrap();
        assert_eq!(state.mode, AcMode::Heat);
        assert_eq!(state.fan_speed, FanSpeed::Auto);
        assert_eq!(state.swing_mode, SwingMode::Vertical);
        assert!(!state.prompt_tone);
    }

    #[test]
    fn decode_rejects_unknown_mode() {
        let reading = AcReading {
            mode: 9,
            ..AcReading::default()
        };
        assert!(matches!(
            reading.decode("ac"),
            Err(Error::UnexpectedReading { field: "mode", code: 9, .. })
        ));
    }

    #[test]
    fn transition_toggles_display_only_on_change() {
        let state = sample_state();
        assert!(!AcTransition::new(true, &state).toggle_display);
        assert!(AcTransition::new(false, &state).toggle_display);
    }
}
