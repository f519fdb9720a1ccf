// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scripted Midea client for unit tests.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::MideaAccount;
use crate::error::{ProtocolError, Result};

use super::client::{AcClient, AcConnector, DiscoveredAc};
use super::state::{AcMode, AcReading, AcSettings, FanSpeed, SwingMode};

/// Calls observed by a [`MockAc`].
#[derive(Debug, Clone, Default)]
pub(crate) struct Calls {
    pub authentications: u32,
    pub capability_queries: u32,
    pub refreshes: u32,
    pub assignments: u32,
    pub applies: u32,
    pub display_toggles: u32,
    pub last_assigned: Option<AcSettings>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MockLog(Arc<Mutex<Calls>>);

impl MockLog {
    pub fn get(&self) -> Calls {
        self.0.lock().clone()
    }

    fn record(&self, f: impl FnOnce(&mut Calls)) {
        f(&mut self.0.lock());
    }
}

fn dropped() -> crate::Error {
    ProtocolError::Device("UnboundLocalError".to_string()).into()
}

#[derive(Debug)]
pub(crate) struct MockAc {
    log: MockLog,
    reading: AcReading,
    auth_failures: u32,
    apply_failures: u32,
    stale_display: bool,
}

impl MockAc {
    pub fn new(log: &MockLog) -> Self {
        Self {
            log: log.clone(),
            reading: AcReading {
                power: true,
                target_temperature: 21.0,
                mode: AcMode::Cool.code(),
                fan_speed: FanSpeed::Medium.code(),
                swing_mode: SwingMode::Off.code(),
                indoor_temperature: 22.0,
                outdoor_temperature: 15.0,
                ..AcReading::default()
            },
            auth_failures: 0,
            apply_failures: 0,
            stale_display: false,
        }
    }

    pub fn failing_auth(mut self, times: u32) -> Self {
        self.auth_failures = times;
        self
    }

    pub fn failing_apply(mut self, times: u32) -> Self {
        self.apply_failures = times;
        self
    }

    pub fn with_temperatures(mut self, indoor: f32, outdoor: f32) -> Self {
        self.reading.indoor_temperature = indoor;
        self.reading.outdoor_temperature = outdoor;
        self
    }

    pub fn with_display(mut self, on: bool) -> Self {
        self.reading.display_on = on;
        self
    }

    /// Keeps reporting the initial display flag after toggles.
    pub fn with_stale_display(mut self) -> Self {
        self.stale_display = true;
        self
    }
}

impl AcClient for MockAc {
    async fn authenticate(&mut self, _key: &str, _token: &str) -> Result<()> {
        self.log.record(|c| c.authentications += 1);
        if self.auth_failures > 0 {
            self.auth_failures -= 1;
            return Err(dropped());
        }
        Ok(())
    }

    async fn get_capabilities(&mut self) -> Result<()> {
        self.log.record(|c| c.capability_queries += 1);
        Ok(())
    }

    async fn refresh(&mut self) -> Result<()> {
        self.log.record(|c| c.refreshes += 1);
        Ok(())
    }

    fn reading(&self) -> AcReading {
        self.reading
    }

    fn assign(&mut self, settings: &AcSettings) {
        let settings = *settings;
        self.log.record(|c| {
            c.assignments += 1;
            c.last_assigned = Some(settings);
        });
    }

    async fn apply(&mut self) -> Result<()> {
        self.log.record(|c| c.applies += 1);
        if self.apply_failures > 0 {
            self.apply_failures -= 1;
            return Err(dropped());
        }
        Ok(())
    }

    async fn toggle_display(&mut self) -> Result<()> {
        self.log.record(|c| c.display_toggles += 1);
        if !self.stale_display {
            self.reading.display_on = !self.reading.display_on;
        }
        Ok(())
    }
}

/// Connector whose probe answers are scripted in order.
#[derive(Debug, Default)]
pub(crate) struct MockConnector {
    pub log: MockLog,
    probes: Mutex<VecDeque<Result<Vec<DiscoveredAc>>>>,
    probe_count: Mutex<u32>,
}

impl MockConnector {
    pub fn answering(answers: Vec<Result<Vec<DiscoveredAc>>>) -> Self {
        Self {
            probes: Mutex::new(answers.into()),
            ..Self::default()
        }
    }

    pub fn probe_count(&self) -> u32 {
        *self.probe_count.lock()
    }
}

impl AcConnector for MockConnector {
    type Client = MockAc;

    fn connect(&self, _ip_address: &str, _identifier: u64, _port: u16) -> MockAc {
        MockAc::new(&self.log)
    }

    async fn probe(&self, _ip_address: &str, _account: &MideaAccount) -> Result<Vec<DiscoveredAc>> {
        *self.probe_count.lock() += 1;
        self.probes.lock().pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}
