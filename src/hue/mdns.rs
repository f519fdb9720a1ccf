// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! One-shot mDNS service browse.
//!
//! A single legacy unicast PTR query is multicast and every answer that
//! arrives before the deadline is collected. Bridges answer such queries
//! directly to the sending port with PTR, SRV, TXT and A records in one
//! packet, so no follow-up queries are needed.

use std::collections::BTreeMap;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use dns_parser::{Packet, QueryClass, QueryType, RData};
use tokio::net::UdpSocket;
use tokio::time::{Instant, timeout_at};

use crate::error::{ProtocolError, Result};

use super::discovery::DiscoveredBridge;

pub(crate) const HUE_SERVICE: &str = "_hue._tcp.local";

const MDNS_GROUP: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::new(224, 0, 0, 251), 5353);
const QUERY_ID: u16 = 0x4855;
const MAX_RECEIVE_ERRORS: u32 = 3;
const RECEIVE_BACKOFF: Duration = Duration::from_millis(100);

pub(crate) async fn browse(service: &str, window: Duration) -> Result<Vec<DiscoveredBridge>> {
    let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0))
        .await
        .map_err(ProtocolError::from)?;

    let mut query = dns_parser::Builder::new_query(QUERY_ID, false);
    query.add_question(service, true, QueryType::PTR, QueryClass::IN);
    let query = query
        .build()
        .map_err(|_| ProtocolError::Device(format!("mDNS query for '{service}' truncated")))?;

    socket
        .send_to(&query, SocketAddr::V4(MDNS_GROUP))
        .await
        .map_err(ProtocolError::from)?;
    tracing::debug!(service, ?window, "mDNS query sent");

    let deadline = Instant::now() + window;
    Ok(collect(deadline, async |buffer: &mut [u8]| socket.recv_from(buffer).await).await)
}

/// Gathers answers until `deadline`, or until receiving fails
/// [`MAX_RECEIVE_ERRORS`] times in a row.
async fn collect(
    deadline: Instant,
    mut receive: impl AsyncFnMut(&mut [u8]) -> io::Result<(usize, SocketAddr)>,
) -> Vec<DiscoveredBridge> {
    let mut found = BTreeMap::new();
    let mut buffer = [0_u8; 4096];
    let mut errors = 0;
    while let Ok(received) = timeout_at(deadline, receive(&mut buffer)).await {
        match received {
            Ok((len, origin)) => {
                errors = 0;
                if let Some(bridge) = parse_answer(&buffer[..len], origin.ip()) {
                    tracing::debug!(id = %bridge.id, address = %bridge.host(), "Hue bridge answered");
                    found.entry(bridge.id.clone()).or_insert(bridge);
                }
            }
            Err(e) => {
                errors += 1;
                tracing::debug!(error = %e, errors, "mDNS receive failed");
                if errors == MAX_RECEIVE_ERRORS {
                    tracing::warn!(error = %e, "Giving up on mDNS answers");
                    break;
                }
                tokio::time::sleep_until((Instant::now() + RECEIVE_BACKOFF).min(deadline)).await;
            }
        }
    }
    found.into_values().collect()
}

/// Extracts a bridge from one response packet.
///
/// The A record is preferred over the packet's source address, and the SRV
/// port over 443. Packets without a `bridgeid` TXT entry are ignored.
fn parse_answer(bytes: &[u8], origin: IpAddr) -> Option<DiscoveredBridge> {
    let packet = Packet::parse(bytes).ok()?;

    let mut id = None;
    let mut address = None;
    let mut port = None;
    for record in packet.answers.iter().chain(&packet.additional) {
        match &record.data {
            RData::TXT(txt) => {
                id = id.or_else(|| {
                    txt.iter()
                        .filter_map(|entry| std::str::from_utf8(entry).ok())
                        .find_map(|entry| entry.strip_prefix("bridgeid="))
                        .map(str::to_string)
                });
            }
            RData::SRV(srv) => port = port.or(Some(srv.port)),
            RData::A(a) => address = address.or(Some(IpAddr::V4(a.0))),
            _ => {}
        }
    }

    Some(DiscoveredBridge {
        id: id?,
        internalipaddress: address.unwrap_or(origin).to_string(),
        port: port.unwrap_or(443),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(out: &mut Vec<u8>, name: &str) {
        for label in name.split('.') {
            out.push(u8::try_from(label.len()).unwrap());
            out.extend_from_slice(label.as_bytes());
        }
        out.push(0);
    }

    fn record(out: &mut Vec<u8>, owner: &str, rtype: u16, rdata: &[u8]) {
        name(out, owner);
        out.extend_from_slice(&rtype.to_be_bytes());
        out.extend_from_slice(&1_u16.to_be_bytes());
        out.extend_from_slice(&120_u32.to_be_bytes());
        out.extend_from_slice(&u16::try_from(rdata.len()).unwrap().to_be_bytes());
        out.extend_from_slice(rdata);
    }

    /// Builds a response with TXT, SRV and optionally A records.
    fn response(txt: &str, with_a: bool) -> Vec<u8> {
        let instance = "HueBridge-1A2B3C._hue._tcp.local";
        let answers: u16 = if with_a { 3 } else { 2 };

        let mut out = Vec::new();
        out.extend_from_slice(&0_u16.to_be_bytes());
        out.extend_from_slice(&0x8400_u16.to_be_bytes());
        out.extend_from_slice(&0_u16.to_be_bytes());
        out.extend_from_slice(&answers.to_be_bytes());
        out.extend_from_slice(&0_u16.to_be_bytes());
        out.extend_from_slice(&0_u16.to_be_bytes());

        let mut rdata = vec![u8::try_from(txt.len()).unwrap()];
        rdata.extend_from_slice(txt.as_bytes());
        record(&mut out, instance, 16, &rdata);

        let mut rdata = Vec::new();
        rdata.extend_from_slice(&0_u16.to_be_bytes());
        rdata.extend_from_slice(&0_u16.to_be_bytes());
        rdata.extend_from_slice(&8443_u16.to_be_bytes());
        name(&mut rdata, "bridge.local");
        record(&mut out, instance, 33, &rdata);

        if with_a {
            record(&mut out, "bridge.local", 1, &[192, 168, 1, 20]);
        }
        out
    }

    #[test]
    fn answer_with_address_record() {
        let bytes = response("bridgeid=001788fffe1a2b3c", true);
        let origin = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));

        let bridge = parse_answer(&bytes, origin).unwrap();

        assert_eq!(bridge.id, "001788fffe1a2b3c");
        assert_eq!(bridge.internalipaddress, "192.168.1.20");
        assert_eq!(bridge.port, 8443);
    }

    #[test]
    fn answer_without_address_falls_back_to_origin() {
        let bytes = response("bridgeid=001788fffe1a2b3c", false);
        let origin = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));

        let bridge = parse_answer(&bytes, origin).unwrap();
        assert_eq!(bridge.internalipaddress, "10.0.0.1");
    }

    #[test]
    fn answer_without_bridge_id_is_ignored() {
        let bytes = response("modelid=BSB002", true);
        assert!(parse_answer(&bytes, IpAddr::V4(Ipv4Addr::LOCALHOST)).is_none());
    }

    fn from_bridge() -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(192, 168, 1, 20), 5353))
    }

    #[tokio::test(start_paused = true)]
    async fn answers_are_collected_until_the_window_closes() {
        let start = Instant::now();
        let mut packets = vec![
            response("bridgeid=001788fffe1a2b3c", true),
            response("bridgeid=001788fffe1a2b3c", true),
        ];

        let bridges = collect(start + Duration::from_secs(5), async |buffer: &mut [u8]| {
            match packets.pop() {
                Some(packet) => {
                    buffer[..packet.len()].copy_from_slice(&packet);
                    Ok((packet.len(), from_bridge()))
                }
                None => std::future::pending().await,
            }
        })
        .await;

        assert_eq!(bridges.len(), 1);
        assert_eq!(Instant::now() - start, Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_receive_errors_end_the_browse() {
        let start = Instant::now();
        let mut calls = 0;

        let bridges = collect(start + Duration::from_secs(5), async |_: &mut [u8]| {
            calls += 1;
            Err(io::Error::from(io::ErrorKind::ConnectionReset))
        })
        .await;

        assert!(bridges.is_empty());
        assert_eq!(calls, MAX_RECEIVE_ERRORS);
        assert_eq!(Instant::now() - start, RECEIVE_BACKOFF * 2);
    }

    #[test]
    fn garbage_is_ignored() {
        assert!(parse_answer(&[1, 2, 3], IpAddr::V4(Ipv4Addr::LOCALHOST)).is_none());
    }
}
