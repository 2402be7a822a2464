// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

//! Lookup tables translating the kernel's textual parameter types into the three
//! target representations: the user-space decoder, the in-kernel record and the
//! outbound wire message.

/// Size of the by-value copy the probe makes of string-like arguments.
pub const MAX_BUFFER_SIZE: usize = 256;

/// Type of a field on the decoder side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DecoderType {
    /// Fixed-size byte buffer of [`MAX_BUFFER_SIZE`] bytes.
    Buffer,
    I32,
    U32,
    I64,
    U64,
}

/// Type of a field in the record the probe writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KernelRecordType {
    /// `char[MAX_BUFFER_SIZE]`
    Char,
    S32,
    U32,
    S64,
    U64,
}

/// Type of a field in the wire message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WireType {
    Bytes,
    String,
    Int32,
    Uint32,
    Int64,
    Uint64,
}

pub static DECODER_TYPES: &[(&str, DecoderType)] = &[
    ("char *", DecoderType::Buffer),
    ("const char *", DecoderType::Buffer),
    ("unsigned char *", DecoderType::Buffer),
    ("int", DecoderType::I64),
    ("long", DecoderType::I64),
    ("pid_t", DecoderType::I64),
    ("off_t", DecoderType::I64),
    ("loff_t", DecoderType::I64),
    ("key_t", DecoderType::I64),
    ("mqd_t", DecoderType::I64),
    ("timer_t", DecoderType::I64),
    ("size_t", DecoderType::I64),
    ("unsigned int", DecoderType::U64),
    ("unsigned", DecoderType::U64),
    ("unsigned long", DecoderType::U64),
    ("umode_t", DecoderType::U64),
    ("u64", DecoderType::U64),
    ("__u64", DecoderType::U64),
    ("aio_context_t", DecoderType::U64),
    ("uid_t", DecoderType::U32),
    ("gid_t", DecoderType::U32),
    ("qid_t", DecoderType::U32),
    ("u32", DecoderType::U32),
    ("const clockid_t", DecoderType::U32),
    ("__s32", DecoderType::I32),
    ("key_serial_t", DecoderType::I32),
    // Pointers the probe does not follow are carried as plain addresses.
    ("int *", DecoderType::U64),
    ("const int *", DecoderType::U64),
    ("size_t *", DecoderType::U64),
    ("loff_t *", DecoderType::U64),
    ("unsigned *", DecoderType::U64),
    ("unsigned int *", DecoderType::U64),
    ("unsigned long *", DecoderType::U64),
    ("const unsigned long *", DecoderType::U64),
    ("u32 *", DecoderType::U64),
    ("uid_t *", DecoderType::U64),
    ("gid_t *", DecoderType::U64),
    ("timer_t *", DecoderType::U64),
    ("time_t *", DecoderType::U64),
    ("aio_context_t *", DecoderType::U64),
    ("void *", DecoderType::U64),
    ("const void *", DecoderType::U64),
];

pub static KERNEL_RECORD_TYPES: &[(&str, KernelRecordType)] = &[
    ("char *", KernelRecordType::Char),
    ("const char *", KernelRecordType::Char),
    ("unsigned char *", KernelRecordType::Char),
    ("int", KernelRecordType::S64),
    ("long", KernelRecordType::S64),
    ("pid_t", KernelRecordType::S64),
    ("off_t", KernelRecordType::S64),
    ("loff_t", KernelRecordType::S64),
    ("key_t", KernelRecordType::S64),
    ("mqd_t", KernelRecordType::S64),
    ("timer_t", KernelRecordType::S64),
    ("size_t", KernelRecordType::S64),
    ("unsigned int", KernelRecordType::U64),
    ("unsigned", KernelRecordType::U64),
    ("unsigned long", KernelRecordType::U64),
    ("umode_t", KernelRecordType::U64),
    ("u64", KernelRecordType::U64),
    ("__u64", KernelRecordType::U64),
    ("aio_context_t", KernelRecordType::U64),
    ("uid_t", KernelRecordType::U32),
    ("gid_t", KernelRecordType::U32),
    ("qid_t", KernelRecordType::U32),
    ("u32", KernelRecordType::U32),
    ("const clockid_t", KernelRecordType::U32),
    ("__s32", KernelRecordType::S32),
    ("key_serial_t", KernelRecordType::S32),
    ("int *", KernelRecordType::U64),
    ("const int *", KernelRecordType::U64),
    ("size_t *", KernelRecordType::U64),
    ("loff_t *", KernelRecordType::U64),
    ("unsigned *", KernelRecordType::U64),
    ("unsigned int *", KernelRecordType::U64),
    ("unsigned long *", KernelRecordType::U64),
    ("const unsigned long *", KernelRecordType::U64),
    ("u32 *", KernelRecordType::U64),
    ("uid_t *", KernelRecordType::U64),
    ("gid_t *", KernelRecordType::U64),
    ("timer_t *", KernelRecordType::U64),
    ("time_t *", KernelRecordType::U64),
    ("aio_context_t *", KernelRecordType::U64),
    ("void *", KernelRecordType::U64),
    ("const void *", KernelRecordType::U64),
];

pub static WIRE_TYPES: &[(DecoderType, WireType)] = &[
    (DecoderType::Buffer, WireType::Bytes),
    (DecoderType::I32, WireType::Int32),
    (DecoderType::U32, WireType::Uint32),
    (DecoderType::I64, WireType::Int64),
    (DecoderType::U64, WireType::Uint64),
];

pub fn decoder_type(kernel_type: &str) -> Option<DecoderType> {
    DECODER_TYPES
        .iter()
        .find(|(name, _)| *name == kernel_type)
        .map(|(_, ty)| *ty)
}

pub fn kernel_record_type(kernel_type: &str) -> Option<KernelRecordType> {
    KERNEL_RECORD_TYPES
        .iter()
        .find(|(name, _)| *name == kernel_type)
        .map(|(_, ty)| *ty)
}

pub fn wire_type(decoder_type: DecoderType) -> Option<WireType> {
    WIRE_TYPES
        .iter()
        .find(|(ty, _)| *ty == decoder_type)
        .map(|(_, wire)| *wire)
}

impl DecoderType {
    /// Number of bytes the field occupies in a captured buffer.
    pub fn size(self) -> usize {
        match self {
            DecoderType::Buffer => MAX_BUFFER_SIZE,
            DecoderType::I32 | DecoderType::U32 => 4,
            DecoderType::I64 | DecoderType::U64 => 8,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(self, DecoderType::I32 | DecoderType::I64)
    }

    pub fn is_buffer(self) -> bool {
        self == DecoderType::Buffer
    }
}

impl KernelRecordType {
    pub fn size(self) -> usize {
        match self {
            KernelRecordType::Char => MAX_BUFFER_SIZE,
            KernelRecordType::S32 | KernelRecordType::U32 => 4,
            KernelRecordType::S64 | KernelRecordType::U64 => 8,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(self, KernelRecordType::S32 | KernelRecordType::S64)
    }

    pub fn is_buffer(self) -> bool {
        self == KernelRecordType::Char
    }
}

impl WireType {
    /// Largest number of bytes a value of this type can carry; `None` for
    /// variable-length types.
    pub fn size(self) -> Option<usize> {
        match self {
            WireType::Bytes | WireType::String => None,
            WireType::Int32 | WireType::Uint32 => Some(4),
            WireType::Int64 | WireType::Uint64 => Some(8),
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(self, WireType::Int32 | WireType::Int64)
    }

    pub fn proto_name(self) -> &'static str {
        match self {
            WireType::Bytes => "bytes",
            WireType::String => "string",
            WireType::Int32 => "int32",
            WireType::Uint32 => "uint32",
            WireType::Int64 => "int64",
            WireType::Uint64 => "uint64",
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn encode(value: i128, size: usize) -> Vec<u8> {
        value.to_ne_bytes()[..size].to_vec()
    }

    fn decode(bytes: &[u8], signed: bool) -> i128 {
        match (bytes.len(), signed) {
            (4, true) => i32::from_ne_bytes(bytes.try_into().unwrap()) as i128,
            (4, false) => u32::from_ne_bytes(bytes.try_into().unwrap()) as i128,
            (8, true) => i64::from_ne_bytes(bytes.try_into().unwrap()) as i128,
            (8, false) => u64::from_ne_bytes(bytes.try_into().unwrap()) as i128,
            (len, _) => panic!("unexpected width {len}"),
        }
    }

    #[test]
    fn tables_cover_the_same_kernel_types() {
        let mut decoder: Vec<_> = DECODER_TYPES.iter().map(|(name, _)| *name).collect();
        let mut kernel: Vec<_> = KERNEL_RECORD_TYPES.iter().map(|(name, _)| *name).collect();
        decoder.sort();
        kernel.sort();
        assert_eq!(decoder, kernel);

        let before = decoder.len();
        decoder.dedup();
        assert_eq!(before, decoder.len(), "duplicate kernel type in table");
    }

    #[test]
    fn every_decoder_type_has_a_wire_type() {
        for (kernel_type, decoder) in DECODER_TYPES {
            assert!(
                wire_type(*decoder).is_some(),
                "{kernel_type} maps to {decoder:?} which has no wire type"
            );
        }
    }

    #[test]
    fn variants_are_size_and_sign_compatible() {
        if cfg!(target_endian = "big") {
            return;
        }

        for (kernel_type, decoder) in DECODER_TYPES {
            let kernel = kernel_record_type(kernel_type).unwrap();
            let wire = wire_type(*decoder).unwrap();

            assert_eq!(decoder.size(), kernel.size(), "{kernel_type}");
            assert_eq!(decoder.is_buffer(), kernel.is_buffer(), "{kernel_type}");

            if decoder.is_buffer() {
                assert_eq!(wire, WireType::Bytes, "{kernel_type}");
                continue;
            }

            assert_eq!(decoder.is_signed(), kernel.is_signed(), "{kernel_type}");
            assert_eq!(decoder.is_signed(), wire.is_signed(), "{kernel_type}");
            assert!(wire.size().unwrap() >= decoder.size(), "{kernel_type}");

            // Write at the record's width, read back at the decoder's width.
            let samples: &[i128] = if kernel.is_signed() {
                &[0, 1, -1, -100, i32::MIN as i128]
            } else {
                &[0, 1, 0o755, u32::MAX as i128]
            };
            for value in samples {
                let bytes = encode(*value, kernel.size());
                assert_eq!(decode(&bytes, decoder.is_signed()), *value, "{kernel_type}");
            }
        }
    }

    #[test]
    fn strings_are_copied_by_value() {
        for kernel_type in ["char *", "const char *", "unsigned char *"] {
            assert_eq!(decoder_type(kernel_type), Some(DecoderType::Buffer));
            assert_eq!(kernel_record_type(kernel_type), Some(KernelRecordType::Char));
        }
        assert_eq!(DecoderType::Buffer.size(), 256);
    }

    #[test]
    fn unknown_types_are_not_mapped() {
        assert_eq!(decoder_type("struct stat *"), None);
        assert_eq!(kernel_record_type("struct stat *"), None);
    }
}
