//! Binary module image.
//!
//! The compiler's output and the loader's input. Layout, all integers
//! big-endian:
//!
//! ```text
//! header   "DYNC"  u16 version  u64 xxh64(payload)
//! payload  str module-name
//!          u16 count, constants   (u8 tag, value)
//!          u16 count, imports     (str namespace, str type, str name,
//!                                  u8 n, n types, type)
//!          u16 count, types       (str qualified-name, u16 count, methods)
//! method   str name  u8 flags  u8 n, n param types  return type
//!          u16 frame-size  u32 len, code
//! type     u8 tag (+ element type for arrays and nullables)
//! str      u32 len, UTF-8
//! ```
//!
//! `Call` operands index methods in image order across all types.

mod reader;
mod writer;

use bitflags::bitflags;
use dyncode_core::RuntimeType;
use dyncode_parser::ast::Modifiers;
use thiserror::Error;

use crate::bytecode::Constant;
use crate::host::HostSignature;

pub use reader::ImageReader;
pub use writer::ImageWriter;

pub const MAGIC: &[u8; 4] = b"DYNC";
pub const FORMAT_VERSION: u16 = 1;
/// Magic, version and checksum.
pub const HEADER_LEN: usize = 4 + 2 + 8;

bitflags! {
    /// Access and storage of a compiled method.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MethodFlags: u8 {
        const PUBLIC    = 1 << 0;
        const PRIVATE   = 1 << 1;
        const PROTECTED = 1 << 2;
        const INTERNAL  = 1 << 3;
        const STATIC    = 1 << 4;
    }
}

impl MethodFlags {
    /// Flags for a declaration; no access keyword means `private`.
    pub fn from_modifiers(modifiers: Modifiers) -> Self {
        let mut flags = MethodFlags::from_bits_truncate(modifiers.access().bits() as u8);
        flags.set(MethodFlags::STATIC, modifiers.is_static());
        flags
    }

    pub fn is_static(&self) -> bool {
        self.contains(MethodFlags::STATIC)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleImage {
    pub name: String,
    pub constants: Vec<Constant>,
    /// Host functions called through `CallHost`, by import index.
    pub imports: Vec<HostSignature>,
    pub types: Vec<TypeImage>,
}

impl ModuleImage {
    pub fn encode(&self) -> Result<Vec<u8>, ImageError> {
        ImageWriter::new().write(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ImageError> {
        ImageReader::new(bytes)?.read()
    }

    /// Every method in `Call` index order.
    pub fn methods(&self) -> impl Iterator<Item = &MethodImage> {
        self.types.iter().flat_map(|ty| ty.methods.iter())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeImage {
    /// `Namespace.Outer.Inner`
    pub name: String,
    pub methods: Vec<MethodImage>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodImage {
    pub name: String,
    pub flags: MethodFlags,
    pub params: Vec<RuntimeType>,
    pub return_type: RuntimeType,
    pub frame_size: u16,
    pub code: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("not a module image")]
    BadMagic,

    #[error("unsupported image format version {0}")]
    UnsupportedVersion(u16),

    #[error("image checksum mismatch")]
    ChecksumMismatch,

    #[error("image truncated at byte {0}")]
    Truncated(usize),

    #[error("invalid {what} tag {tag} at byte {offset}")]
    InvalidTag {
        what: &'static str,
        tag: u8,
        offset: usize,
    },

    #[error("unexpected data after the image at byte {0}")]
    TrailingBytes(usize),

    #[error("invalid UTF-8 in image string at byte {0}")]
    InvalidUtf8(usize),

    #[error("invalid character {0:#x} in image")]
    InvalidChar(u32),

    #[error("{what} does not fit in the image format")]
    TooLarge { what: &'static str },
}

// Type tags.
const TAG_VOID: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_CHAR: u8 = 2;
const TAG_INT32: u8 = 3;
const TAG_INT64: u8 = 4;
const TAG_SINGLE: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_STRING: u8 = 7;
const TAG_ARRAY: u8 = 8;
const TAG_NULLABLE: u8 = 9;

// Constant tags.
const CONST_INT32: u8 = 0;
const CONST_INT64: u8 = 1;
const CONST_FLOAT32: u8 = 2;
const CONST_FLOAT64: u8 = 3;
const CONST_CHAR: u8 = 4;
const CONST_STRING: u8 = 5;

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ModuleImage {
        ModuleImage {
            name: "Sample".into(),
            constants: vec![
                Constant::Int32(-7),
                Constant::Int64(1 << 40),
                Constant::Float32(1.5),
                Constant::Float64(f64::MIN_POSITIVE),
                Constant::Char('é'),
                Constant::String("héllo".into()),
            ],
            imports: vec![HostSignature::new(
                "System",
                "Math",
                "Max",
                vec![RuntimeType::Int32, RuntimeType::Int32],
                RuntimeType::Int32,
            )],
            types: vec![TypeImage {
                name: "Demo.Calculator".into(),
                methods: vec![MethodImage {
                    name: "Add".into(),
                    flags: MethodFlags::PUBLIC | MethodFlags::STATIC,
                    params: vec![
                        RuntimeType::Array(Box::new(RuntimeType::Nullable(Box::new(
                            RuntimeType::Int64,
                        )))),
                        RuntimeType::String,
                    ],
                    return_type: RuntimeType::Void,
                    frame_size: 3,
                    code: vec![1, 2, 3],
                }],
            }],
        }
    }

    #[test]
    fn encodes_and_decodes() {
        let image = sample();
        let bytes = image.encode().unwrap();
        assert_eq!(&bytes[..4], MAGIC);
        assert_eq!(ModuleImage::decode(&bytes).unwrap(), image);
    }

    #[test]
    fn rejects_foreign_bytes() {
        assert_eq!(ModuleImage::decode(b"MZ\x90\x00"), Err(ImageError::BadMagic));
        assert_eq!(ModuleImage::decode(b"DY"), Err(ImageError::BadMagic));
    }

    #[test]
    fn rejects_other_versions() {
        let mut bytes = sample().encode().unwrap();
        bytes[5] = 9;
        assert_eq!(ModuleImage::decode(&bytes), Err(ImageError::UnsupportedVersion(9)));
    }

    #[test]
    fn detects_corruption() {
        let mut bytes = sample().encode().unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert_eq!(ModuleImage::decode(&bytes), Err(ImageError::ChecksumMismatch));
    }

    #[test]
    fn detects_truncation() {
        let bytes = sample().encode().unwrap();
        assert!(matches!(
            ModuleImage::decode(&bytes[..HEADER_LEN - 1]),
            Err(ImageError::Truncated(_))
        ));
    }

    #[test]
    fn flags_from_modifiers() {
        assert_eq!(MethodFlags::from_modifiers(Modifiers::empty()), MethodFlags::PRIVATE);
        assert_eq!(
            MethodFlags::from_modifiers(Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::SEALED),
            MethodFlags::PUBLIC | MethodFlags::STATIC
        );
    }
}
