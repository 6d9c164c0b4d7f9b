//! Image decoding.

use dyncode_core::RuntimeType;
use xxhash_rust::xxh64::xxh64;

use super::*;

/// Deserializes a [`ModuleImage`] after checking its header and checksum.
#[derive(Debug)]
pub struct ImageReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ImageReader<'a> {
    /// Validate the header and checksum.
    pub fn new(bytes: &'a [u8]) -> Result<Self, ImageError> {
        if bytes.get(..MAGIC.len()) != Some(MAGIC.as_slice()) {
            return Err(ImageError::BadMagic);
        }
        let mut reader = Self {
            bytes,
            pos: MAGIC.len(),
        };
        let version = reader.u16()?;
        if version != FORMAT_VERSION {
            return Err(ImageError::UnsupportedVersion(version));
        }
        let checksum = reader.u64()?;
        if xxh64(&bytes[HEADER_LEN..], 0) != checksum {
            return Err(ImageError::ChecksumMismatch);
        }
        Ok(reader)
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn read(mut self) -> Result<ModuleImage, ImageError> {
        let name = self.str()?;

        let count = self.u16()?;
        let mut constants = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            constants.push(self.constant()?);
        }

        let count = self.u16()?;
        let mut imports = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            let namespace = self.str()?;
            let type_name = self.str()?;
            let name = self.str()?;
            let (params, return_type) = self.signature()?;
            imports.push(HostSignature {
                namespace,
                type_name,
                name,
                params,
                return_type,
            });
        }

        let count = self.u16()?;
        let mut types = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            let name = self.str()?;
            let method_count = self.u16()?;
            let mut methods = Vec::with_capacity(usize::from(method_count));
            for _ in 0..method_count {
                methods.push(self.method()?);
            }
            types.push(TypeImage { name, methods });
        }

        if self.pos != self.bytes.len() {
            return Err(ImageError::TrailingBytes(self.pos));
        }
        Ok(ModuleImage {
            name,
            constants,
            imports,
            types,
        })
    }

    fn method(&mut self) -> Result<MethodImage, ImageError> {
        let name = self.str()?;
        let flags = MethodFlags::from_bits_truncate(self.u8()?);
        let (params, return_type) = self.signature()?;
        let frame_size = self.u16()?;
        let code = self.bytes()?.to_vec();
        Ok(MethodImage {
            name,
            flags,
            params,
            return_type,
            frame_size,
            code,
        })
    }

    fn signature(&mut self) -> Result<(Vec<RuntimeType>, RuntimeType), ImageError> {
        let count = self.u8()?;
        let params = (0..count).map(|_| self.ty()).collect::<Result<Vec<_>, _>>()?;
        let return_type = self.ty()?;
        Ok((params, return_type))
    }

    fn ty(&mut self) -> Result<RuntimeType, ImageError> {
        let offset = self.pos;
        Ok(match self.u8()? {
            TAG_VOID => RuntimeType::Void,
            TAG_BOOL => RuntimeType::Boolean,
            TAG_CHAR => RuntimeType::Char,
            TAG_INT32 => RuntimeType::Int32,
            TAG_INT64 => RuntimeType::Int64,
            TAG_SINGLE => RuntimeType::Single,
            TAG_DOUBLE => RuntimeType::Double,
            TAG_STRING => RuntimeType::String,
            TAG_ARRAY => RuntimeType::Array(Box::new(self.ty()?)),
            TAG_NULLABLE => RuntimeType::Nullable(Box::new(self.ty()?)),
            tag => {
                return Err(ImageError::InvalidTag {
                    what: "type",
                    tag,
                    offset,
                });
            }
        })
    }

    fn constant(&mut self) -> Result<Constant, ImageError> {
        let offset = self.pos;
        Ok(match self.u8()? {
            CONST_INT32 => Constant::Int32(i32::from_be_bytes(self.array()?)),
            CONST_INT64 => Constant::Int64(i64::from_be_bytes(self.array()?)),
            CONST_FLOAT32 => Constant::Float32(f32::from_bits(u32::from_be_bytes(self.array()?))),
            CONST_FLOAT64 => Constant::Float64(f64::from_bits(u64::from_be_bytes(self.array()?))),
            CONST_CHAR => {
                let code = u32::from_be_bytes(self.array()?);
                Constant::Char(char::from_u32(code).ok_or(ImageError::InvalidChar(code))?)
            }
            CONST_STRING => Constant::String(self.str()?),
            tag => {
                return Err(ImageError::InvalidTag {
                    what: "constant",
                    tag,
                    offset,
                });
            }
        })
    }

    fn str(&mut self) -> Result<String, ImageError> {
        let offset = self.pos;
        let bytes = self.bytes()?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| ImageError::InvalidUtf8(offset))
    }

    fn bytes(&mut self) -> Result<&'a [u8], ImageError> {
        let len = u32::from_be_bytes(self.array()?) as usize;
        self.take(len)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ImageError> {
        let end = self.pos.checked_add(len).filter(|&end| end <= self.bytes.len());
        let Some(end) = end else {
            return Err(ImageError::Truncated(self.pos));
        };
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], ImageError> {
        let slice = self.take(N)?;
        let mut out = [0; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, ImageError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, ImageError> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64, ImageError> {
        Ok(u64::from_be_bytes(self.array()?))
    }
}
