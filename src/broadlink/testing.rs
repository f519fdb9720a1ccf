// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scripted Broadlink client for unit tests.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{ProtocolError, Result};

use super::client::{BroadlinkClient, BroadlinkConnector, DiscoveredBroadlink};

#[derive(Debug, Default)]
struct Observed {
    auths: u32,
    learning_entries: u32,
    checks: u32,
    sent: Vec<Vec<u8>>,
}

/// Shared view of what a [`MockBlaster`] was asked to do.
#[derive(Debug, Clone, Default)]
pub(crate) struct Script(Arc<Mutex<Observed>>);

impl Script {
    pub fn auths(&self) -> u32 {
        self.0.lock().auths
    }

    pub fn learning_entries(&self) -> u32 {
        self.0.lock().learning_entries
    }

    pub fn checks(&self) -> u32 {
        self.0.lock().checks
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.0.lock().sent.clone()
    }
}

#[derive(Debug)]
pub(crate) struct MockBlaster {
    script: Script,
    supports_ir: bool,
    packet: Option<(u32, Vec<u8>)>,
    erroring_checks: bool,
    fail_sends: bool,
    fail_auth: bool,
}

impl MockBlaster {
    pub fn new(script: &Script) -> Self {
        Self {
            script: script.clone(),
            supports_ir: true,
            packet: None,
            erroring_checks: false,
            fail_sends: false,
            fail_auth: false,
        }
    }

    /// The packet becomes available on the `check`th poll.
    pub fn packet_after(mut self, check: u32, packet: Vec<u8>) -> Self {
        self.packet = Some((check, packet));
        self
    }

    pub fn erroring_checks(mut self) -> Self {
        self.erroring_checks = true;
        self
    }

    pub fn without_ir(mut self) -> Self {
        self.supports_ir = false;
        self
    }

    pub fn failing_sends(mut self) -> Self {
        self.fail_sends = true;
        self
    }

    pub fn failing_auth(mut self) -> Self {
        self.fail_auth = true;
        self
    }
}

impl BroadlinkClient for MockBlaster {
    fn supports_ir(&self) -> bool {
        self.supports_ir
    }

    async fn auth(&mut self) -> Result<()> {
        self.script.0.lock().auths += 1;
        if self.fail_auth {
            return Err(ProtocolError::Device("authentication failed".to_string()).into());
        }
        Ok(())
    }

    async fn enter_learning(&mut self) -> Result<()> {
        self.script.0.lock().learning_entries += 1;
        Ok(())
    }

    async fn check_data(&mut self) -> Result<Option<Vec<u8>>> {
        let checks = {
            let mut observed = self.script.0.lock();
            observed.checks += 1;
            observed.checks
        };
        match &self.packet {
            Some((ready_at, packet)) if checks >= *ready_at => Ok(Some(packet.clone())),
            _ if self.erroring_checks => {
                Err(ProtocolError::Device("storage is full".to_string()).into())
            }
            _ => Ok(None),
        }
    }

    async fn send_data(&mut self, packet: &[u8]) -> Result<()> {
        self.script.0.lock().sent.push(packet.to_vec());
        if self.fail_sends {
            return Err(ProtocolError::Timeout("no ack".to_string()).into());
        }
        Ok(())
    }
}

/// Connector that answers `hello` only for the listed addresses.
#[derive(Debug, Default)]
pub(crate) struct MockNetwork {
    pub script: Script,
    pub online: Vec<String>,
    pub without_ir: bool,
}

impl MockNetwork {
    pub fn with_devices(addresses: &[&str]) -> Self {
        Self {
            online: addresses.iter().map(ToString::to_string).collect(),
            ..Self::default()
        }
    }
}

impl BroadlinkConnector for MockNetwork {
    type Client = MockBlaster;

    async fn hello(&self, ip_address: &str) -> Result<MockBlaster> {
        if !self.online.iter().any(|ip| ip == ip_address) {
            return Err(ProtocolError::Timeout(format!("no answer from {ip_address}")).into());
        }
        let mut blaster = MockBlaster::new(&self.script).packet_after(1, vec![0xAA, 0xBB]);
        if self.without_ir {
            blaster = blaster.without_ir();
        }
        Ok(blaster)
    }

    async fn discover_all(&self) -> Result<Vec<DiscoveredBroadlink>> {
        Ok(self
            .online
            .iter()
            .map(|ip| DiscoveredBroadlink {
                ip_address: ip.clone(),
            })
            .collect())
    }
}
