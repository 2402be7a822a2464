// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

use std::pin::Pin;

use anyhow::Result;
use clap::ValueEnum;
use tokio::io::{AsyncWrite, AsyncWriteExt as _};

/// Push formatted argument to the formatter
#[macro_export]
macro_rules! argf {
    ($sf:expr, $($arg:tt)*) => {
        $sf.push_arg(format!($($arg)*).as_bytes()).await?
    };
}

/// Finish formatting with a return value
#[macro_export]
macro_rules! finish {
    ($sf:expr, $retval:expr) => {
        $sf.finish($retval, None).await?
    };
    ($sf:expr, $retval:expr, $extra:expr) => {
        $sf.finish($retval, Some($extra)).await?
    };
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum FormattingStyle {
    #[default]
    OneLine,
    MultiLine,
}

pub struct Formatter<'f> {
    style: FormattingStyle,
    output: Pin<&'f mut dyn AsyncWrite>,
}

impl<'f> Formatter<'f> {
    pub fn new(output: Pin<&'f mut dyn AsyncWrite>, style: FormattingStyle) -> Self {
        Formatter { style, output }
    }

    pub async fn push_syscall(mut self, pid: u32, name: &str) -> Result<SyscallFormatter<'f>> {
        let output = &mut self.output;

        output.write_all(pid.to_string().as_bytes()).await?;

        match self.style {
            FormattingStyle::OneLine => output.write_all(b" ").await?,
            FormattingStyle::MultiLine => output.write_all(b"\n\t").await?,
        };

        output.write_all(name.as_bytes()).await?;
        output.write_all(b"(").await?;

        Ok(SyscallFormatter {
            formatter: self,
            argc: 0,
            name: name.to_string(),
        })
    }
}

pub struct SyscallFormatter<'f> {
    formatter: Formatter<'f>,
    argc: usize,
    name: String,
}

const INDENT_STEP: &[u8] = &[b' '; 4];

impl<'f> SyscallFormatter<'f> {
    pub async fn push_arg(&mut self, arg: &[u8]) -> Result<()> {
        let output = &mut self.formatter.output;

        // Always add a comma after a previous argument, if any.
        if self.argc > 0 {
            output.write_all(b",").await?;
        }
        match self.formatter.style {
            FormattingStyle::OneLine => {
                if self.argc > 0 {
                    output.write_all(b" ").await?;
                }
                output.write_all(arg).await?;
            }
            FormattingStyle::MultiLine => {
                output.write_all(b"\n\t").await?;
                output.write_all(INDENT_STEP).await?;
                output.write_all(arg).await?;
            }
        }

        self.argc += 1;

        Ok(())
    }

    pub async fn finish(
        mut self,
        return_value: i64,
        suffix: Option<&[u8]>,
    ) -> Result<Formatter<'f>> {
        let formatted = crate::format_helpers::format_return_value(&self.name, return_value);

        let output = &mut self.formatter.output;

        if let FormattingStyle::MultiLine = self.formatter.style {
            output.write_all(b"\n\t").await?;
        }

        output.write_all(b") = ").await?;
        output.write_all(formatted.as_bytes()).await?;

        if let Some(suffix) = suffix {
            output.write_all(suffix).await?;
        }

        output.write_all(b"\n").await?;

        Ok(self.formatter)
    }
}

#[cfg(test)]
mod test {
    use indoc::indoc;

    use super::*;

    #[tokio::test]
    async fn simple() {
        let mut output: Vec<u8> = vec![];
        let pinned_output = Pin::new(&mut output);

        let formatter = Formatter::new(pinned_output, FormattingStyle::MultiLine);

        let mut sysformatter = formatter.push_syscall(1, "close").await.unwrap();
        sysformatter.push_arg(b"fd: 1").await.unwrap();

        let _ = sysformatter.finish(0, Some(b" <STUB>")).await.unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            indoc! {"
                1
                \tclose(
                \t    fd: 1
                \t) = 0 (success) <STUB>
            "}
            .to_string()
        );
    }

    async fn two_args(style: FormattingStyle) -> Result<String> {
        let mut output: Vec<u8> = vec![];
        let pinned_output = Pin::new(&mut output);
        let formatter = Formatter::new(pinned_output, style);

        let mut sf = formatter.push_syscall(42, "read").await?;
        argf!(sf, "fd: {}<{}>", 3, "/etc/hosts");
        argf!(sf, "count: {}", 128);
        finish!(sf, 12);

        Ok(String::from_utf8(output)?)
    }

    #[tokio::test]
    async fn styles() {
        assert_eq!(
            two_args(FormattingStyle::OneLine).await.unwrap(),
            "42 read(fd: 3</etc/hosts>, count: 128) = 12 (bytes)\n"
        );
        assert_eq!(
            two_args(FormattingStyle::MultiLine).await.unwrap(),
            indoc! {"
                42
                \tread(
                \t    fd: 3</etc/hosts>,
                \t    count: 128
                \t) = 12 (bytes)
            "}
        );
    }

    #[tokio::test]
    async fn no_arguments() {
        let mut output: Vec<u8> = vec![];
        let pinned_output = Pin::new(&mut output);
        let formatter = Formatter::new(pinned_output, FormattingStyle::OneLine);

        let sf = formatter.push_syscall(7, "mystery").await.unwrap();
        sf.finish(-1, None).await.unwrap();

        assert_eq!(String::from_utf8(output).unwrap(), "7 mystery() = -1 (error)\n");
    }
}
