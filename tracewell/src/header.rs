// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

use bytes::Buf as _;
use tracewell_common::{COMMON_EVENT_SIZE, EVENT_NAME_LEN};

use crate::{error::DecodeError, format_helpers::c_str, wire::ProtobufCommonEvent};

/// The decoded [`tracewell_common::CommonEvent`] every buffer starts with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub timestamp: u64,
    pub pid: i64,
    pub ret: i64,
    pub name: String,
}

impl Header {
    /// Consumes the header from the front of `buf`.
    pub fn decode(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        if buf.len() < COMMON_EVENT_SIZE {
            return Err(DecodeError::TruncatedHeader { len: buf.len() });
        }

        let timestamp = buf.get_u64_ne();
        let pid = buf.get_i64_ne();
        let ret = buf.get_i64_ne();

        let (name, rest) = buf.split_at(EVENT_NAME_LEN);
        *buf = rest;

        // A name that isn't UTF-8 matches no decoder and falls through to
        // the default event.
        let name = String::from_utf8_lossy(c_str(name)).into_owned();

        Ok(Header {
            timestamp,
            pid,
            ret,
            name,
        })
    }

    pub fn metric(&self) -> ProtobufCommonEvent {
        ProtobufCommonEvent {
            timestamp: self.timestamp,
            pid: self.pid,
            ret: self.ret,
            name: self.name.clone(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod test {
    use tracewell_common::CommonEvent;

    use super::*;

    fn header_bytes(event: &CommonEvent) -> Vec<u8> {
        let mut bytes = vec![];
        bytes.extend_from_slice(&event.timestamp.to_ne_bytes());
        bytes.extend_from_slice(&event.pid.to_ne_bytes());
        bytes.extend_from_slice(&event.ret.to_ne_bytes());
        bytes.extend_from_slice(&event.name);
        bytes
    }

    #[test]
    fn decode_consumes_the_header() {
        let mut bytes = header_bytes(&CommonEvent::new(42, 100, -1, "open"));
        bytes.extend_from_slice(b"rest");

        let mut buf = bytes.as_slice();
        let header = Header::decode(&mut buf).unwrap();

        assert_eq!(
            header,
            Header {
                timestamp: 42,
                pid: 100,
                ret: -1,
                name: "open".to_string(),
            }
        );
        assert_eq!(buf, b"rest");
    }

    #[test]
    fn short_buffers_are_rejected() {
        let bytes = header_bytes(&CommonEvent::new(0, 0, 0, "close"));
        let mut buf = &bytes[..COMMON_EVENT_SIZE - 1];

        assert_eq!(
            Header::decode(&mut buf),
            Err(DecodeError::TruncatedHeader { len: 87 })
        );
    }

    #[test]
    fn non_utf8_names_are_decoded_lossily() {
        let mut event = CommonEvent::new(0, 0, 0, "");
        event.name[..3].copy_from_slice(&[0xff, 0xfe, b'x']);
        let bytes = header_bytes(&event);

        let header = Header::decode(&mut bytes.as_slice()).unwrap();
        assert_eq!(header.name, "\u{fffd}\u{fffd}x");
    }

    #[test]
    fn metric_mirrors_the_header() {
        let bytes = header_bytes(&CommonEvent::new(7, 8, 9, "fchown"));
        let header = Header::decode(&mut bytes.as_slice()).unwrap();

        let metric = header.metric();
        assert_eq!(metric.timestamp, 7);
        assert_eq!(metric.pid, 8);
        assert_eq!(metric.ret, 9);
        assert_eq!(metric.name, "fchown");
        assert_eq!(metric.hash, 0);
        assert_eq!(metric.flags, 0);
    }
}
