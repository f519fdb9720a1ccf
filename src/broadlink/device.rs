// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connected Broadlink IR blaster.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::{Error, Result, ValidationError};
use crate::record::BroadlinkDeviceRecord;
use crate::retry::{Operation, RetryPolicy};

use super::client::BroadlinkClient;

/// How long [`BroadlinkDevice::record_ir_packet`] waits for a packet.
pub const LEARNING_WINDOW: Duration = Duration::from_secs(10);

/// Interval between polls while learning.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// An authenticated session with one Broadlink device.
#[derive(Debug)]
pub struct BroadlinkDevice<C> {
    record: BroadlinkDeviceRecord,
    target: String,
    client: Mutex<C>,
    learning_window: Duration,
}

impl<C: BroadlinkClient> BroadlinkDevice<C> {
    /// Authenticates `client`. Broadlink handshakes are not retried.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Authentication`] if the handshake fails.
    pub async fn connect(record: BroadlinkDeviceRecord, mut client: C) -> Result<Self> {
        let target = record.id.to_string();
        single_attempt()
            .run(&target, Operation::Authenticate, async || client.auth().await)
            .await?;

        Ok(Self {
            record,
            target,
            client: Mutex::new(client),
            learning_window: LEARNING_WINDOW,
        })
    }

    /// Sets how long learning waits for a packet.
    #[must_use]
    pub fn with_learning_window(mut self, window: Duration) -> Self {
        self.learning_window = window;
        self
    }

    /// Returns the record this session was opened from.
    #[must_use]
    pub fn record(&self) -> &BroadlinkDeviceRecord {
        &self.record
    }

    /// Puts the device into learning mode and waits for an IR packet.
    ///
    /// The device is polled once a second until a packet arrives or the
    /// learning window (10 seconds by default) elapses.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if the device has no IR transmitter.
    /// - [`Error::RecordTimeout`] if no packet arrives in time.
    /// - [`Error::Connection`] if learning mode cannot be entered.
    pub async fn record_ir_packet(&self) -> Result<Vec<u8>> {
        let mut client = self.client.lock().await;
        self.ensure_ir(&*client, Operation::Learn)?;

        single_attempt()
            .run(&self.target, Operation::Learn, async || {
                client.enter_learning().await
            })
            .await?;
        tracing::debug!(device_id = %self.target, window = ?self.learning_window, "Waiting for IR packet");

        let deadline = Instant::now() + self.learning_window;
        while Instant::now() < deadline {
            tokio::time::sleep(POLL_INTERVAL).await;
            match client.check_data().await {
                Ok(Some(packet)) => {
                    tracing::info!(device_id = %self.target, bytes = packet.len(), "IR packet learned");
                    return Ok(packet);
                }
                Ok(None) | Err(Error::Protocol(_)) => {}
                Err(e) => return Err(e),
            }
        }

        Err(Error::RecordTimeout {
            device_id: self.target.clone(),
            window: self.learning_window,
        })
    }

    /// Transmits `packet` once.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if the device has no IR transmitter.
    /// - [`Error::Connection`] if the send fails.
    pub async fn send_ir_packet(&self, packet: &[u8]) -> Result<()> {
        let mut client = self.client.lock().await;
        self.ensure_ir(&*client, Operation::Send)?;

        single_attempt()
            .run(&self.target, Operation::Send, async || {
                client.send_data(packet).await
            })
            .await
    }

    fn ensure_ir(&self, client: &C, operation: Operation) -> Result<()> {
        if client.supports_ir() {
            Ok(())
        } else {
            Err(ValidationError::IncompatibleDevice {
                device_id: self.target.clone(),
                operation,
            }
            .into())
        }
    }
}

fn single_attempt() -> RetryPolicy {
    RetryPolicy::immediate().with_max_attempts(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadlink::testing::{MockBlaster, Script};

    async fn connected(mock: MockBlaster) -> BroadlinkDevice<MockBlaster> {
        let record = BroadlinkDeviceRecord::new("Lounge", "192.168.1.40");
        BroadlinkDevice::connect(record, mock).await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn learning_times_out_after_window() {
        let script = Script::default();
        let device = connected(MockBlaster::new(&script)).await;
        let start = Instant::now();

        let err = device.record_ir_packet().await.unwrap_err();

        assert!(matches!(err, Error::RecordTimeout { window, .. } if window == LEARNING_WINDOW));
        assert_eq!(start.elapsed(), LEARNING_WINDOW);
        assert_eq!(script.checks(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn learning_returns_first_packet_and_stops() {
        let script = Script::default();
        let device = connected(MockBlaster::new(&script).packet_after(3, vec![0x26, 0x00, 0x1a])).await;
        let start = Instant::now();

        let packet = device.record_ir_packet().await.unwrap();

        assert_eq!(packet, vec![0x26, 0x00, 0x1a]);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
        assert_eq!(script.checks(), 3);
        assert_eq!(script.learning_entries(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn read_errors_while_learning_mean_not_yet() {
        let script = Script::default();
        let device = connected(
            MockBlaster::new(&script)
                .erroring_checks()
                .packet_after(2, vec![1, 2, 3]),
        )
        .await;

        assert_eq!(device.record_ir_packet().await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn device_without_ir_is_incompatible() {
        let script = Script::default();
        let device = connected(MockBlaster::new(&script).without_ir()).await;

        let err = device.send_ir_packet(&[1, 2, 3]).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::IncompatibleDevice {
                operation: Operation::Send,
                ..
            })
        ));

        let err = device.record_ir_packet().await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(script.learning_entries(), 0);
        assert!(script.sent().is_empty());
    }

    #[tokio::test]
    async fn send_is_not_retried() {
        let script = Script::default();
        let device = connected(MockBlaster::new(&script).failing_sends()).await;

        let err = device.send_ir_packet(&[9, 9]).await.unwrap_err();

        assert!(matches!(err, Error::Connection { attempts: 1, .. }));
        assert_eq!(script.sent().len(), 1);
    }

    #[tokio::test]
    async fn failed_auth_is_not_retried() {
        let script = Script::default();
        let record = BroadlinkDeviceRecord::new("Lounge", "192.168.1.40");

        let err = BroadlinkDevice::connect(record, MockBlaster::new(&script).failing_auth())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Authentication { attempts: 1, .. }));
        assert_eq!(script.auths(), 1);
    }
}
