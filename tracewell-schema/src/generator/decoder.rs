// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

//! User-space decoder events.
//!
//! The output is included into a module of the `tracewell` crate which brings
//! `Header`, `Context`, `DecodeError`, `ArgError`, `TraceEvent`, the wire types
//! and the buffer helpers into scope.

use std::fmt::Write as _;

use super::{check_aligned, rust_ident, HEADER};
use crate::{
    compiler::{BufferPolicy, Param, Syscall, SyscallSchemas},
    types::{DecoderType, KernelRecordType},
};

pub fn generate_decoder(schemas: &SyscallSchemas) -> anyhow::Result<String> {
    check_aligned(schemas)?;

    let mut out = String::from(HEADER);

    for ((decoder, kernel), wire) in schemas
        .decoder
        .iter()
        .zip(&schemas.kernel)
        .zip(&schemas.wire)
    {
        write_struct(&mut out, decoder)?;
        write_decode(&mut out, decoder, kernel)?;
        write_trace_event(&mut out, decoder, &wire.name)?;
    }

    write_syscall_enum(&mut out, &schemas.decoder)?;
    write_dispatch(&mut out, &schemas.decoder)?;

    Ok(out)
}

fn rust_type(ty: DecoderType) -> &'static str {
    match ty {
        DecoderType::Buffer => "[u8; MAX_BUFFER_SIZE]",
        DecoderType::I32 => "i32",
        DecoderType::U32 => "u32",
        DecoderType::I64 => "i64",
        DecoderType::U64 => "u64",
    }
}

/// Reads at the width the probe wrote the field with.
fn read_expr(ty: KernelRecordType) -> &'static str {
    match ty {
        KernelRecordType::Char => "read_buffer(payload)",
        KernelRecordType::S32 => "payload.get_i32_ne()",
        KernelRecordType::U32 => "payload.get_u32_ne()",
        KernelRecordType::S64 => "payload.get_i64_ne()",
        KernelRecordType::U64 => "payload.get_u64_ne()",
    }
}

fn path_field(param: &Param<DecoderType>) -> String {
    format!("{}_path", param.raw_name)
}

fn uses_ret(syscall: &Syscall<DecoderType>) -> bool {
    syscall.buffer_policy == BufferPolicy::ReturnBounded
        && syscall.param_types().any(DecoderType::is_buffer)
}

/// Expression turning a field into the string shown to users.
fn display_expr(syscall: &Syscall<DecoderType>, param: &Param<DecoderType>) -> String {
    let field = rust_ident(&param.raw_name);
    if !param.ty.is_buffer() {
        return format!("self.{field}");
    }

    match syscall.buffer_policy {
        BufferPolicy::NulTerminated => format!("String::from_utf8_lossy(c_str(&self.{field}))"),
        BufferPolicy::ReturnBounded => {
            format!("String::from_utf8_lossy(ret_bounded(&self.{field}, ret))")
        }
    }
}

fn write_struct(out: &mut String, syscall: &Syscall<DecoderType>) -> std::fmt::Result {
    writeln!(out)?;
    writeln!(out, "/// `{}` as decoded from the probe.", syscall.raw_name)?;
    writeln!(out, "#[derive(Clone, Debug, PartialEq, Eq)]")?;
    writeln!(out, "pub struct {} {{", syscall.name)?;
    for param in &syscall.params {
        writeln!(out, "    pub {}: {},", rust_ident(&param.raw_name), rust_type(param.ty))?;
        if param.needs_path {
            writeln!(out, "    pub {}: String,", path_field(param))?;
        }
    }
    writeln!(out, "}}")
}

fn write_decode(
    out: &mut String,
    decoder: &Syscall<DecoderType>,
    kernel: &Syscall<KernelRecordType>,
) -> std::fmt::Result {
    let payload_size: usize = kernel.param_types().map(KernelRecordType::size).sum();
    let resolves_paths = decoder.params.iter().any(|p| p.needs_path);
    let forgets_fd = decoder.raw_name == "close";
    let arg_names = decoder
        .params
        .iter()
        .map(|p| format!("{:?}", p.raw_name))
        .collect::<Vec<_>>()
        .join(", ");

    let header = if resolves_paths { "header" } else { "_header" };
    let ctx = if resolves_paths || forgets_fd { "ctx" } else { "_ctx" };
    let binding = if resolves_paths { "mut event" } else { "event" };

    writeln!(out)?;
    writeln!(out, "impl {} {{", decoder.name)?;
    writeln!(out, "    pub const NAME: &'static str = {:?};", decoder.raw_name)?;
    writeln!(out, "    pub const ARG_NAMES: &'static [&'static str] = &[{arg_names}];")?;
    writeln!(out, "    /// Bytes following the common header.")?;
    writeln!(out, "    pub const PAYLOAD_SIZE: usize = {payload_size};")?;
    writeln!(out)?;
    writeln!(out, "    pub fn decode(")?;
    writeln!(out, "        {header}: &Header,")?;
    writeln!(out, "        payload: &mut &[u8],")?;
    writeln!(out, "        {ctx}: &Context,")?;
    writeln!(out, "    ) -> Result<Self, DecodeError> {{")?;
    writeln!(out, "        ensure_payload(Self::NAME, payload, Self::PAYLOAD_SIZE)?;")?;
    writeln!(out)?;
    writeln!(out, "        let {binding} = Self {{")?;
    for (param, record) in decoder.params.iter().zip(&kernel.params) {
        writeln!(out, "            {}: {},", rust_ident(&param.raw_name), read_expr(record.ty))?;
        if param.needs_path {
            writeln!(out, "            {}: String::new(),", path_field(param))?;
        }
    }
    writeln!(out, "        }};")?;

    if resolves_paths {
        writeln!(out)?;
    }
    for param in decoder.params.iter().filter(|p| p.needs_path) {
        writeln!(
            out,
            "        event.{} = ctx.resolve_fd_path(header.pid as u32, event.{} as u32);",
            path_field(param),
            rust_ident(&param.raw_name)
        )?;
    }
    if forgets_fd {
        writeln!(out, "        ctx.forget_fd(header.pid as u32, event.fd as u32);")?;
    }

    writeln!(out)?;
    writeln!(out, "        Ok(event)")?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}")
}

fn write_trace_event(
    out: &mut String,
    syscall: &Syscall<DecoderType>,
    wire_name: &str,
) -> std::fmt::Result {
    let ret = if uses_ret(syscall) { "ret" } else { "_ret" };

    let mut template = String::new();
    let mut values = vec![];
    for param in &syscall.params {
        if param.ty.is_buffer() {
            template.push_str(&format!("{} {{:?}} ", param.name));
        } else if param.needs_path {
            template.push_str(&format!("{} {{}}<{{}}> ", param.name));
        } else {
            template.push_str(&format!("{} {{}} ", param.name));
        }
        values.push(display_expr(syscall, param));
        if param.needs_path {
            values.push(format!("self.{}", path_field(param)));
        }
    }

    writeln!(out)?;
    writeln!(out, "impl TraceEvent for {} {{", syscall.name)?;

    writeln!(out, "    fn render(&self, {ret}: i64) -> String {{")?;
    writeln!(out, "        format!(")?;
    writeln!(out, "            {template:?},")?;
    for value in &values {
        writeln!(out, "            {value},")?;
    }
    writeln!(out, "        )")?;
    writeln!(out, "    }}")?;
    writeln!(out)?;

    writeln!(out, "    fn arg(&self, n: usize, {ret}: i64) -> Result<String, ArgError> {{")?;
    writeln!(out, "        match n {{")?;
    for param in &syscall.params {
        writeln!(
            out,
            "            {} => Ok({}.to_string()),",
            param.position,
            display_expr(syscall, param)
        )?;
    }
    writeln!(out, "            _ => Err(ArgError::OutOfRange {{")?;
    writeln!(out, "                event: Self::NAME,")?;
    writeln!(out, "                index: n,")?;
    writeln!(out, "            }}),")?;
    writeln!(out, "        }}")?;
    writeln!(out, "    }}")?;
    writeln!(out)?;

    writeln!(out, "    fn args(&self, {ret}: i64) -> Vec<(&'static str, String)> {{")?;
    writeln!(out, "        vec![")?;
    for param in &syscall.params {
        let value = display_expr(syscall, param);
        let value = if param.ty.is_buffer() {
            format!("format!(\"{{:?}}\", {value})")
        } else if param.needs_path {
            format!("format!(\"{{}}<{{}}>\", {value}, self.{})", path_field(param))
        } else {
            format!("{value}.to_string()")
        };
        writeln!(out, "            ({:?}, {value}),", param.raw_name)?;
    }
    writeln!(out, "        ]")?;
    writeln!(out, "    }}")?;
    writeln!(out)?;

    writeln!(out, "    fn metric(&self) -> Option<Metric> {{")?;
    writeln!(out, "        Some(Metric {{")?;
    writeln!(out, "            event: Some(metric::Event::{}({wire_name} {{", syscall.name)?;
    for param in &syscall.params {
        let field = rust_ident(&param.raw_name);
        if param.ty.is_buffer() {
            writeln!(out, "                {field}: self.{field}.to_vec(),")?;
        } else {
            writeln!(out, "                {field}: self.{field}.into(),")?;
        }
    }
    writeln!(out, "            }})),")?;
    writeln!(out, "            ..Default::default()")?;
    writeln!(out, "        }})")?;
    writeln!(out, "    }}")?;

    writeln!(out, "}}")
}

fn write_syscall_enum(out: &mut String, syscalls: &[Syscall<DecoderType>]) -> std::fmt::Result {
    let delegate = |out: &mut String, call: &str| -> std::fmt::Result {
        writeln!(out, "        match self {{")?;
        for syscall in syscalls {
            writeln!(
                out,
                "            SyscallEvent::{}(event) => event.{call},",
                syscall.camel_name()
            )?;
        }
        writeln!(out, "        }}")
    };

    writeln!(out)?;
    writeln!(out, "/// Any of the traced syscalls.")?;
    writeln!(out, "#[derive(Clone, Debug, PartialEq, Eq)]")?;
    writeln!(out, "pub enum SyscallEvent {{")?;
    for syscall in syscalls {
        writeln!(out, "    {}({}),", syscall.camel_name(), syscall.name)?;
    }
    writeln!(out, "}}")?;
    writeln!(out)?;

    writeln!(out, "impl SyscallEvent {{")?;
    writeln!(out, "    pub fn name(&self) -> &'static str {{")?;
    writeln!(out, "        match self {{")?;
    for syscall in syscalls {
        writeln!(
            out,
            "            SyscallEvent::{}(_) => {}::NAME,",
            syscall.camel_name(),
            syscall.name
        )?;
    }
    writeln!(out, "        }}")?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}")?;
    writeln!(out)?;

    writeln!(out, "impl TraceEvent for SyscallEvent {{")?;
    writeln!(out, "    fn render(&self, ret: i64) -> String {{")?;
    delegate(out, "render(ret)")?;
    writeln!(out, "    }}")?;
    writeln!(out)?;
    writeln!(out, "    fn arg(&self, n: usize, ret: i64) -> Result<String, ArgError> {{")?;
    delegate(out, "arg(n, ret)")?;
    writeln!(out, "    }}")?;
    writeln!(out)?;
    writeln!(out, "    fn args(&self, ret: i64) -> Vec<(&'static str, String)> {{")?;
    delegate(out, "args(ret)")?;
    writeln!(out, "    }}")?;
    writeln!(out)?;
    writeln!(out, "    fn metric(&self) -> Option<Metric> {{")?;
    delegate(out, "metric()")?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}")
}

fn write_dispatch(out: &mut String, syscalls: &[Syscall<DecoderType>]) -> std::fmt::Result {
    writeln!(out)?;
    writeln!(out, "/// Decodes the payload of a traced syscall; `None` if `header` names")?;
    writeln!(out, "/// an event that is not one of them.")?;
    writeln!(out, "pub fn decode_syscall(")?;
    writeln!(out, "    header: &Header,")?;
    writeln!(out, "    payload: &mut &[u8],")?;
    writeln!(out, "    ctx: &Context,")?;
    writeln!(out, ") -> Option<Result<SyscallEvent, DecodeError>> {{")?;
    writeln!(out, "    let event = match header.name.as_str() {{")?;
    for syscall in syscalls {
        writeln!(
            out,
            "        {:?} => {}::decode(header, payload, ctx).map(SyscallEvent::{}),",
            syscall.raw_name,
            syscall.name,
            syscall.camel_name()
        )?;
    }
    writeln!(out, "        _ => return None,")?;
    writeln!(out, "    }};")?;
    writeln!(out)?;
    writeln!(out, "    Some(event)")?;
    writeln!(out, "}}")
}

#[cfg(test)]
mod test {
    use indoc::indoc;

    use super::*;
    use crate::generator::test::sample_schemas;

    #[test]
    fn read_event_decodes_and_resolves() {
        let out = generate_decoder(&sample_schemas()).unwrap();

        let expected = indoc! {r#"
            /// `read` as decoded from the probe.
            #[derive(Clone, Debug, PartialEq, Eq)]
            pub struct ReadEvent {
                pub fd: u64,
                pub fd_path: String,
                pub buf: [u8; MAX_BUFFER_SIZE],
                pub count: i64,
            }

            impl ReadEvent {
                pub const NAME: &'static str = "read";
                pub const ARG_NAMES: &'static [&'static str] = &["fd", "buf", "count"];
                /// Bytes following the common header.
                pub const PAYLOAD_SIZE: usize = 272;

                pub fn decode(
                    header: &Header,
                    payload: &mut &[u8],
                    ctx: &Context,
                ) -> Result<Self, DecodeError> {
                    ensure_payload(Self::NAME, payload, Self::PAYLOAD_SIZE)?;

                    let mut event = Self {
                        fd: payload.get_u64_ne(),
                        fd_path: String::new(),
                        buf: read_buffer(payload),
                        count: payload.get_i64_ne(),
                    };

                    event.fd_path = ctx.resolve_fd_path(header.pid as u32, event.fd as u32);

                    Ok(event)
                }
            }
        "#};
        assert!(out.contains(expected), "{out}");
    }

    #[test]
    fn read_renders_return_bounded_buffers() {
        let out = generate_decoder(&sample_schemas()).unwrap();

        let expected = indoc! {r#"
            impl TraceEvent for ReadEvent {
                fn render(&self, ret: i64) -> String {
                    format!(
                        "Fd {}<{}> Buf {:?} Count {} ",
                        self.fd,
                        self.fd_path,
                        String::from_utf8_lossy(ret_bounded(&self.buf, ret)),
                        self.count,
                    )
                }
        "#};
        assert!(out.contains(expected), "{out}");
    }

    #[test]
    fn chown_renders_c_strings() {
        let out = generate_decoder(&sample_schemas()).unwrap();

        let expected = indoc! {r#"
            impl TraceEvent for ChownEvent {
                fn render(&self, _ret: i64) -> String {
                    format!(
                        "Filename {:?} User {} Group {} ",
                        String::from_utf8_lossy(c_str(&self.filename)),
                        self.user,
                        self.group,
                    )
                }

                fn arg(&self, n: usize, _ret: i64) -> Result<String, ArgError> {
                    match n {
                        0 => Ok(String::from_utf8_lossy(c_str(&self.filename)).to_string()),
                        1 => Ok(self.user.to_string()),
                        2 => Ok(self.group.to_string()),
                        _ => Err(ArgError::OutOfRange {
                            event: Self::NAME,
                            index: n,
                        }),
                    }
                }
        "#};
        assert!(out.contains(expected), "{out}");

        // No descriptor, so neither the header nor the context is needed.
        assert!(out.contains("        _header: &Header,\n"), "{out}");
        assert!(out.contains("        _ctx: &Context,\n"), "{out}");
    }

    #[test]
    fn close_forgets_the_descriptor() {
        let out = generate_decoder(&sample_schemas()).unwrap();

        let expected = concat!(
            "        event.fd_path = ctx.resolve_fd_path(header.pid as u32, event.fd as u32);\n",
            "        ctx.forget_fd(header.pid as u32, event.fd as u32);\n",
        );
        assert!(out.contains(expected), "{out}");
        assert_eq!(out.matches("ctx.forget_fd(").count(), 1);
    }

    #[test]
    fn args_are_ready_to_display() {
        let out = generate_decoder(&sample_schemas()).unwrap();

        let expected = concat!(
            "    fn args(&self, ret: i64) -> Vec<(&'static str, String)> {\n",
            "        vec![\n",
            "            (\"fd\", format!(\"{}<{}>\", self.fd, self.fd_path)),\n",
            "            (\"buf\", format!(\"{:?}\", String::from_utf8_lossy(ret_bounded(&self.buf, ret)))),\n",
            "            (\"count\", self.count.to_string()),\n",
            "        ]\n",
            "    }\n",
        );
        assert!(out.contains(expected), "{out}");
    }

    #[test]
    fn metric_carries_every_field() {
        let out = generate_decoder(&sample_schemas()).unwrap();

        let expected = concat!(
            "    fn metric(&self) -> Option<Metric> {\n",
            "        Some(Metric {\n",
            "            event: Some(metric::Event::ReadEvent(ProtobufReadEvent {\n",
            "                fd: self.fd.into(),\n",
            "                buf: self.buf.to_vec(),\n",
            "                count: self.count.into(),\n",
            "            })),\n",
            "            ..Default::default()\n",
            "        })\n",
            "    }\n",
        );
        assert!(out.contains(expected), "{out}");
    }

    #[test]
    fn dispatch_covers_every_syscall() {
        let out = generate_decoder(&sample_schemas()).unwrap();

        for line in [
            r#""chown" => ChownEvent::decode(header, payload, ctx).map(SyscallEvent::Chown),"#,
            r#""close" => CloseEvent::decode(header, payload, ctx).map(SyscallEvent::Close),"#,
            r#""read" => ReadEvent::decode(header, payload, ctx).map(SyscallEvent::Read),"#,
            "_ => return None,",
            "SyscallEvent::Read(_) => ReadEvent::NAME,",
        ] {
            assert!(out.contains(line), "missing {line}\n{out}");
        }
    }

    #[test]
    fn keyword_fields_are_escaped() {
        let mut schemas = sample_schemas();
        for param in &mut schemas.decoder[0].params {
            if param.raw_name == "group" {
                param.raw_name = "type".to_string();
            }
        }
        for param in &mut schemas.kernel[0].params {
            if param.raw_name == "group" {
                param.raw_name = "type".to_string();
            }
        }
        for param in &mut schemas.wire[0].params {
            if param.raw_name == "group" {
                param.raw_name = "type".to_string();
            }
        }

        let out = generate_decoder(&schemas).unwrap();
        assert!(out.contains("pub r#type: u32,"), "{out}");
        assert!(out.contains("r#type: payload.get_u32_ne(),"), "{out}");
    }
}
