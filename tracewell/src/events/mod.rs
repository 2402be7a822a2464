// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

use log::trace;
use tracewell_common::{
    ACCEPT_V4_EVENT, ACCEPT_V6_EVENT, CLOSE_V4_EVENT, CLOSE_V6_EVENT, CONNECT_V4_EVENT,
    CONNECT_V6_EVENT, FD_INSTALL_EVENT,
};

use crate::{
    argf,
    context::Context,
    error::{ArgError, DecodeError},
    finish,
    formatting::Formatter,
    header::Header,
    wire::Metric,
};

mod file;
mod generated;
mod network;

pub use file::FileEvent;
pub use generated::*;
pub use network::{ConnectV4Event, ConnectV6Event};

const V4_EVENTS: &[&str] = &[CONNECT_V4_EVENT, ACCEPT_V4_EVENT, CLOSE_V4_EVENT];
const V6_EVENTS: &[&str] = &[CONNECT_V6_EVENT, ACCEPT_V6_EVENT, CLOSE_V6_EVENT];

/// What every decoded event can do.
pub trait TraceEvent {
    /// Human readable form, `ret` being the value the syscall returned.
    fn render(&self, ret: i64) -> String;

    /// The `n`th argument as a string.
    fn arg(&self, n: usize, ret: i64) -> Result<String, ArgError>;

    /// Every argument with its name, formatted for display.
    fn args(&self, ret: i64) -> Vec<(&'static str, String)>;

    /// The event as a wire message, for events that have one.
    fn metric(&self) -> Option<Metric>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Syscall(SyscallEvent),
    File(FileEvent),
    ConnectV4(ConnectV4Event),
    ConnectV6(ConnectV6Event),
    /// Anything we have no decoder for.
    Default,
}

const DEFAULT_EVENT: &str = "default";

impl Event {
    /// Decodes the payload following `header`, consuming exactly the bytes the
    /// event is made of.
    pub fn decode(
        header: &Header,
        payload: &mut &[u8],
        ctx: &Context,
    ) -> Result<Self, DecodeError> {
        if let Some(event) = decode_syscall(header, payload, ctx) {
            return event.map(Event::Syscall);
        }

        let name = header.name.as_str();

        if name == FD_INSTALL_EVENT {
            return FileEvent::decode(header, payload, ctx).map(Event::File);
        }

        if let Some(kind) = V4_EVENTS.iter().copied().find(|kind| *kind == name) {
            return ConnectV4Event::decode(kind, payload).map(Event::ConnectV4);
        }

        if let Some(kind) = V6_EVENTS.iter().copied().find(|kind| *kind == name) {
            return ConnectV6Event::decode(kind, payload).map(Event::ConnectV6);
        }

        trace!("No decoder for {name:?} events");
        Ok(Event::Default)
    }
}

impl TraceEvent for Event {
    fn render(&self, ret: i64) -> String {
        match self {
            Event::Syscall(event) => event.render(ret),
            Event::File(event) => event.render(ret),
            Event::ConnectV4(event) => event.render(ret),
            Event::ConnectV6(event) => event.render(ret),
            Event::Default => String::new(),
        }
    }

    fn arg(&self, n: usize, ret: i64) -> Result<String, ArgError> {
        match self {
            Event::Syscall(event) => event.arg(n, ret),
            Event::File(event) => event.arg(n, ret),
            Event::ConnectV4(event) => event.arg(n, ret),
            Event::ConnectV6(event) => event.arg(n, ret),
            Event::Default => Err(ArgError::Unsupported {
                event: DEFAULT_EVENT,
            }),
        }
    }

    fn args(&self, ret: i64) -> Vec<(&'static str, String)> {
        match self {
            Event::Syscall(event) => event.args(ret),
            Event::File(event) => event.args(ret),
            Event::ConnectV4(event) => event.args(ret),
            Event::ConnectV6(event) => event.args(ret),
            Event::Default => vec![],
        }
    }

    fn metric(&self) -> Option<Metric> {
        match self {
            Event::Syscall(event) => event.metric(),
            Event::File(event) => event.metric(),
            Event::ConnectV4(event) => event.metric(),
            Event::ConnectV6(event) => event.metric(),
            Event::Default => None,
        }
    }
}

/// A captured buffer, decoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedEvent {
    pub header: Header,
    pub event: Event,
}

impl DecodedEvent {
    pub fn render(&self) -> String {
        self.event.render(self.header.ret)
    }

    pub fn arg(&self, n: usize) -> Result<String, ArgError> {
        self.event.arg(n, self.header.ret)
    }

    /// The wire envelope for this event, counting it once.
    pub fn metric(&self) -> Option<Metric> {
        let mut metric = self.event.metric()?;
        metric.count = 1;
        metric.common_event = Some(self.header.metric());
        Some(metric)
    }
}

/// Decodes one buffer as written by the probe: the common header followed by
/// the event's payload. Bytes past the payload are ignored.
pub fn decode_buffer(buf: &[u8], ctx: &Context) -> Result<DecodedEvent, DecodeError> {
    let mut buf = buf;
    let header = Header::decode(&mut buf)?;
    let event = Event::decode(&header, &mut buf, ctx)?;

    Ok(DecodedEvent { header, event })
}

/// Writes `event` as a trace line.
pub async fn handle_event<'f>(
    event: &DecodedEvent,
    formatter: Formatter<'f>,
) -> anyhow::Result<Formatter<'f>> {
    let header = &event.header;

    let mut sf = formatter
        .push_syscall(header.pid as u32, &header.name)
        .await?;

    for (name, value) in event.event.args(header.ret) {
        argf!(sf, "{name}: {value}");
    }

    Ok(finish!(sf, header.ret))
}
