// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connected air conditioning unit.

use tokio::sync::Mutex;

use crate::error::Result;
use crate::record::AcDeviceRecord;
use crate::retry::{Operation, RetryPolicy};

use super::client::AcClient;
use super::state::{AcState, AcTransition};

/// An authenticated session with one air conditioning unit.
///
/// Calls are serialized: the protocol client handles one request at a time.
#[derive(Debug)]
pub struct AcDevice<C> {
    record: AcDeviceRecord,
    target: String,
    link: Mutex<Link<C>>,
    retry: RetryPolicy,
}

#[derive(Debug)]
struct Link<C> {
    client: C,
    // Display flag set by our last toggle. Cleared by a refresh, after which
    // the client's reading is authoritative again.
    display_on: Option<bool>,
}

impl<C: AcClient> Link<C> {
    fn display_on(&self) -> bool {
        self.display_on
            .unwrap_or_else(|| self.client.reading().display_on)
    }
}

impl<C: AcClient> AcDevice<C> {
    /// Authenticates `client` with the credentials in `record` and reads the
    /// unit's capabilities, retrying each step according to `retry`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Authentication`](crate::Error::Authentication) if the
    /// handshake keeps failing, or
    /// [`Error::Connection`](crate::Error::Connection) if the capability
    /// query does.
    pub async fn connect(record: AcDeviceRecord, mut client: C, retry: RetryPolicy) -> Result<Self> {
        let target = record.id.to_string();
        tracing::debug!(device_id = %target, ip = %record.ip_address, "Connecting to air conditioning unit");

        retry
            .run(&target, Operation::Authenticate, async || {
                client.authenticate(&record.key, &record.token).await
            })
            .await?;
        retry
            .run(&target, Operation::Capabilities, async || {
                client.get_capabilities().await
            })
            .await?;

        Ok(Self {
            record,
            target,
            link: Mutex::new(Link {
                client,
                display_on: None,
            }),
            retry,
        })
    }

    /// Returns the record this session was opened from.
    #[must_use]
    pub fn record(&self) -> &AcDeviceRecord {
        &self.record
    }

    /// Reads the current state from the unit.
    ///
    /// Units sometimes report 0 °C for both sensors right after waking up;
    /// such a reading triggers exactly one more refresh.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`](crate::Error::Connection) if the refresh
    /// keeps failing, or
    /// [`Error::UnexpectedReading`](crate::Error::UnexpectedReading) if the
    /// unit reports a code with no mapping.
    pub async fn get_state(&self) -> Result<AcState> {
        let mut link = self.link.lock().await;
        self.refresh(&mut link).await?;

        if link.client.reading().is_false_zero() {
            tracing::warn!(device_id = %self.target, "Both temperature sensors read zero, refreshing again");
            self.refresh(&mut link).await?;
        }

        link.client.reading().decode(&self.target)
    }

    /// Sends `state` to the unit.
    ///
    /// The state is validated before anything is sent. The display is
    /// toggled afterwards only if its requested flag differs from the last
    /// known one: the flag set by this session's previous toggle, or the
    /// last one read from the unit if a refresh happened since. The toggle
    /// is not retried since repeating it would undo it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`](crate::Error::Validation) for an invalid
    /// state without contacting the unit, or
    /// [`Error::Connection`](crate::Error::Connection) if apply keeps
    /// failing.
    pub async fn set_state(&self, state: &AcState) -> Result<()> {
        state.validate(&self.target)?;

        let mut link = self.link.lock().await;
        let transition = AcTransition::new(link.display_on(), state);
        let client = &mut link.client;
        client.assign(&transition.settings);

        self.retry
            .run(&self.target, Operation::Apply, async || client.apply().await)
            .await?;

        if transition.toggle_display {
            tracing::debug!(device_id = %self.target, display_on = state.display_on, "Toggling display");
            RetryPolicy::immediate()
                .with_max_attempts(1)
                .run(&self.target, Operation::ToggleDisplay, async || {
                    client.toggle_display().await
                })
                .await?;
            link.display_on = Some(state.display_on);
        }
        Ok(())
    }

    async fn refresh(&self, link: &mut Link<C>) -> Result<()> {
        let client = &mut link.client;
        self.retry
            .run(&self.target, Operation::Refresh, async || client.refresh().await)
            .await?;
        link.display_on = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aircon::state::{AcMode, FanSpeed, SwingMode};
    use crate::aircon::testing::{MockAc, MockLog};
    use crate::error::Error;

    fn record() -> AcDeviceRecord {
        AcDeviceRecord::new("Bedroom", "192.168.1.5", 1234, "key", "token")
    }

    fn requested() -> AcState {
        AcState {
            power: true,
            target_temperature: 22.0,
            mode: AcMode::Cool,
            fan_speed: FanSpeed::Low,
            swing_mode: SwingMode::Off,
            eco_mode: false,
            turbo_mode: false,
            fahrenheit: false,
            display_on: true,
            indoor_temperature: 0.0,
            outdoor_temperature: 0.0,
            prompt_tone: true,
        }
    }

    async fn connected(mock: MockAc) -> AcDevice<MockAc> {
        AcDevice::connect(record(), mock, RetryPolicy::immediate())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn connect_retries_authentication() {
        let log = MockLog::default();
        let mock = MockAc::new(&log).failing_auth(2);

        let device = connected(mock).await;

        assert_eq!(device.record().name, "Bedroom");
        assert_eq!(log.get().authentications, 3);
        assert_eq!(log.get().capability_queries, 1);
    }

    #[tokio::test]
    async fn connect_gives_up_after_three_attempts() {
        let log = MockLog::default();
        let mock = MockAc::new(&log).failing_auth(5);

        let err = AcDevice::connect(record(), mock, RetryPolicy::immediate())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Authentication { attempts: 3, .. }));
        assert_eq!(log.get().authentications, 3);
    }

    #[tokio::test]
    async fn invalid_state_performs_no_io() {
        let log = MockLog::default();
        let device = connected(MockAc::new(&log)).await;
        let before = log.get();

        let mut hot = requested();
        hot.target_temperature = 31.0;
        let mut cold = requested();
        cold.target_temperature = 15.0;
        let mut both = requested();
        both.eco_mode = true;
        both.turbo_mode = true;

        for state in [hot, cold, both] {
            let err = device.set_state(&state).await.unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }

        let after = log.get();
        assert_eq!(after.applies, before.applies);
        assert_eq!(after.assignments, 0);
        assert_eq!(after.refreshes, before.refreshes);
        assert_eq!(after.display_toggles, 0);
    }

    #[tokio::test]
    async fn false_zero_reading_refreshes_exactly_once_more() {
        let log = MockLog::default();
        let device = connected(MockAc::new(&log).with_temperatures(0.0, 0.0)).await;

        let state = device.get_state().await.unwrap();

        assert_eq!(log.get().refreshes, 2);
        assert!(state.indoor_temperature.abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn normal_reading_refreshes_once() {
        let log = MockLog::default();
        let device = connected(MockAc::new(&log).with_temperatures(23.5, 11.0)).await;

        let state = device.get_state().await.unwrap();

        assert_eq!(log.get().refreshes, 1);
        assert!((state.indoor_temperature - 23.5).abs() < f32::EPSILON);
        assert_eq!(state.mode, AcMode::Cool);
    }

    #[tokio::test]
    async fn apply_is_retried() {
        let log = MockLog::default();
        let device = connected(MockAc::new(&log).failing_apply(2)).await;

        device.set_state(&requested()).await.unwrap();

        assert_eq!(log.get().applies, 3);
        assert_eq!(log.get().last_assigned.map(|s| s.fan_speed), Some(FanSpeed::Low));
    }

    #[tokio::test]
    async fn apply_exhaustion_is_a_connection_error() {
        let log = MockLog::default();
        let device = connected(MockAc::new(&log).failing_apply(10)).await;

        let err = device.set_state(&requested()).await.unwrap_err();

        assert!(matches!(
            err,
            Error::Connection {
                operation: Operation::Apply,
                attempts: 3,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn display_toggled_only_when_flag_changes() {
        let log = MockLog::default();
        let device = connected(MockAc::new(&log).with_display(true)).await;

        device.set_state(&requested()).await.unwrap();
        assert_eq!(log.get().display_toggles, 0);

        let mut dark = requested();
        dark.display_on = false;
        device.set_state(&dark).await.unwrap();
        assert_eq!(log.get().display_toggles, 1);
    }

    #[tokio::test]
    async fn toggle_is_remembered_until_next_refresh() {
        let log = MockLog::default();
        let device = connected(MockAc::new(&log).with_display(true).with_stale_display()).await;
        let mut dark = requested();
        dark.display_on = false;

        device.set_state(&dark).await.unwrap();
        device.set_state(&dark).await.unwrap();
        assert_eq!(log.get().display_toggles, 1);

        // The unit still reports the display as on after a refresh.
        device.get_state().await.unwrap();
        device.set_state(&dark).await.unwrap();
        assert_eq!(log.get().display_toggles, 2);
    }
}
