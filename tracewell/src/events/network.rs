// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

use std::mem::size_of;

use bytes::Buf as _;
use tracewell_common::{ConnectV4Data, ConnectV6Data};

use super::TraceEvent;
use crate::{
    error::{ArgError, DecodeError},
    format_helpers::{ensure_payload, format_ipv4, format_ipv6},
    wire::{metric, Metric, ProtobufConnectV4Event, ProtobufConnectV6Event},
};

/// An IPv4 connection was established, accepted or closed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectV4Event {
    /// Which of the v4 events this came from.
    pub kind: &'static str,
    pub saddr: u32,
    pub daddr: u32,
    pub sport: u16,
    pub dport: u16,
    pub netns: u32,
}

impl ConnectV4Event {
    pub const PAYLOAD_SIZE: usize = size_of::<ConnectV4Data>();

    pub fn decode(kind: &'static str, payload: &mut &[u8]) -> Result<Self, DecodeError> {
        ensure_payload(kind, payload, Self::PAYLOAD_SIZE)?;

        Ok(ConnectV4Event {
            kind,
            saddr: payload.get_u32_ne(),
            daddr: payload.get_u32_ne(),
            sport: payload.get_u16_ne(),
            dport: payload.get_u16_ne(),
            netns: payload.get_u32_ne(),
        })
    }
}

impl TraceEvent for ConnectV4Event {
    fn render(&self, _ret: i64) -> String {
        format!(
            "Saddr {} Daddr {} Sport {} Dport {} Netns {} ",
            format_ipv4(self.saddr),
            format_ipv4(self.daddr),
            self.sport,
            self.dport,
            self.netns
        )
    }

    fn arg(&self, n: usize, ret: i64) -> Result<String, ArgError> {
        nth_arg(self.kind, self.args(ret), n)
    }

    fn args(&self, _ret: i64) -> Vec<(&'static str, String)> {
        vec![
            ("saddr", format_ipv4(self.saddr)),
            ("daddr", format_ipv4(self.daddr)),
            ("sport", self.sport.to_string()),
            ("dport", self.dport.to_string()),
            ("netns", self.netns.to_string()),
        ]
    }

    fn metric(&self) -> Option<Metric> {
        Some(Metric {
            event: Some(metric::Event::ConnectV4Event(ProtobufConnectV4Event {
                saddr: self.saddr,
                daddr: self.daddr,
                sport: self.sport.into(),
                dport: self.dport.into(),
                netns: self.netns,
            })),
            ..Default::default()
        })
    }
}

/// An IPv6 connection was established, accepted or closed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectV6Event {
    pub kind: &'static str,
    pub saddr: [u8; 16],
    pub daddr: [u8; 16],
    pub sport: u16,
    pub dport: u16,
    pub netns: u32,
}

impl ConnectV6Event {
    pub const PAYLOAD_SIZE: usize = size_of::<ConnectV6Data>();

    pub fn decode(kind: &'static str, payload: &mut &[u8]) -> Result<Self, DecodeError> {
        ensure_payload(kind, payload, Self::PAYLOAD_SIZE)?;

        let mut saddr = [0u8; 16];
        payload.copy_to_slice(&mut saddr);
        let mut daddr = [0u8; 16];
        payload.copy_to_slice(&mut daddr);

        Ok(ConnectV6Event {
            kind,
            saddr,
            daddr,
            sport: payload.get_u16_ne(),
            dport: payload.get_u16_ne(),
            netns: payload.get_u32_ne(),
        })
    }
}

impl TraceEvent for ConnectV6Event {
    fn render(&self, _ret: i64) -> String {
        format!(
            "Saddr {} Daddr {} Sport {} Dport {} Netns {} ",
            format_ipv6(self.saddr),
            format_ipv6(self.daddr),
            self.sport,
            self.dport,
            self.netns
        )
    }

    fn arg(&self, n: usize, ret: i64) -> Result<String, ArgError> {
        nth_arg(self.kind, self.args(ret), n)
    }

    fn args(&self, _ret: i64) -> Vec<(&'static str, String)> {
        vec![
            ("saddr", format_ipv6(self.saddr)),
            ("daddr", format_ipv6(self.daddr)),
            ("sport", self.sport.to_string()),
            ("dport", self.dport.to_string()),
            ("netns", self.netns.to_string()),
        ]
    }

    fn metric(&self) -> Option<Metric> {
        Some(Metric {
            event: Some(metric::Event::ConnectV6Event(ProtobufConnectV6Event {
                saddr: format_ipv6(self.saddr),
                daddr: format_ipv6(self.daddr),
                sport: self.sport.into(),
                dport: self.dport.into(),
                netns: self.netns,
            })),
            ..Default::default()
        })
    }
}

fn nth_arg(
    event: &'static str,
    args: Vec<(&'static str, String)>,
    n: usize,
) -> Result<String, ArgError> {
    args.into_iter()
        .nth(n)
        .map(|(_, value)| value)
        .ok_or(ArgError::OutOfRange { event, index: n })
}

#[cfg(test)]
mod test {
    use tracewell_common::{CONNECT_V4_EVENT, CONNECT_V6_EVENT};

    use super::*;

    #[test]
    fn v4_renders_dotted_addresses() {
        let mut bytes = vec![];
        bytes.extend_from_slice(&[10, 0, 0, 1]);
        bytes.extend_from_slice(&[93, 184, 216, 34]);
        bytes.extend_from_slice(&40000u16.to_ne_bytes());
        bytes.extend_from_slice(&443u16.to_ne_bytes());
        bytes.extend_from_slice(&4026531840u32.to_ne_bytes());

        let event = ConnectV4Event::decode(CONNECT_V4_EVENT, &mut bytes.as_slice()).unwrap();
        assert_eq!(
            event.render(0),
            "Saddr 10.0.0.1 Daddr 93.184.216.34 Sport 40000 Dport 443 Netns 4026531840 "
        );
        assert_eq!(event.arg(1, 0).unwrap(), "93.184.216.34");
        assert_eq!(
            event.arg(5, 0),
            Err(ArgError::OutOfRange {
                event: CONNECT_V4_EVENT,
                index: 5,
            })
        );

        let Some(metric::Event::ConnectV4Event(wire)) = event.metric().unwrap().event else {
            panic!("wrong metric");
        };
        assert_eq!(wire.saddr, u32::from_ne_bytes([10, 0, 0, 1]));
        assert_eq!(wire.dport, 443);
    }

    #[test]
    fn v6_metric_carries_text() {
        let mut bytes = vec![0u8; 16];
        bytes[15] = 1;
        let mut daddr = [0u8; 16];
        daddr[..2].copy_from_slice(&[0x20, 0x01]);
        daddr[2..4].copy_from_slice(&[0x0d, 0xb8]);
        daddr[15] = 2;
        bytes.extend_from_slice(&daddr);
        bytes.extend_from_slice(&1234u16.to_ne_bytes());
        bytes.extend_from_slice(&80u16.to_ne_bytes());
        bytes.extend_from_slice(&1u32.to_ne_bytes());

        let event = ConnectV6Event::decode(CONNECT_V6_EVENT, &mut bytes.as_slice()).unwrap();
        assert_eq!(
            event.render(0),
            "Saddr ::1 Daddr 2001:db8::2 Sport 1234 Dport 80 Netns 1 "
        );

        let Some(metric::Event::ConnectV6Event(wire)) = event.metric().unwrap().event else {
            panic!("wrong metric");
        };
        assert_eq!(wire.saddr, "::1");
        assert_eq!(wire.daddr, "2001:db8::2");
    }

    #[test]
    fn short_payloads_are_rejected() {
        let bytes = [0u8; 10];
        assert_eq!(
            ConnectV4Event::decode(CONNECT_V4_EVENT, &mut &bytes[..]),
            Err(DecodeError::TruncatedPayload {
                event: CONNECT_V4_EVENT,
                expected: 16,
                actual: 10,
            })
        );
    }
}
