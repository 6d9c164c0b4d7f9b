//! Image encoding.

use dyncode_core::RuntimeType;
use xxhash_rust::xxh64::xxh64;

use super::*;

/// Serializes a [`ModuleImage`].
#[derive(Debug, Default)]
pub struct ImageWriter {
    payload: Vec<u8>,
}

impl ImageWriter {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn write(mut self, image: &ModuleImage) -> Result<Vec<u8>, ImageError> {
        self.str(&image.name)?;

        self.count_u16(image.constants.len(), "constant pool")?;
        for constant in &image.constants {
            self.constant(constant)?;
        }

        self.count_u16(image.imports.len(), "import table")?;
        for import in &image.imports {
            self.str(&import.namespace)?;
            self.str(&import.type_name)?;
            self.str(&import.name)?;
            self.signature(&import.params, &import.return_type)?;
        }

        self.count_u16(image.types.len(), "type table")?;
        for ty in &image.types {
            self.str(&ty.name)?;
            self.count_u16(ty.methods.len(), "method table")?;
            for method in &ty.methods {
                self.method(method)?;
            }
        }

        let mut out = Vec::with_capacity(HEADER_LEN + self.payload.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&FORMAT_VERSION.to_be_bytes());
        out.extend_from_slice(&xxh64(&self.payload, 0).to_be_bytes());
        out.extend_from_slice(&self.payload);
        Ok(out)
    }

    fn method(&mut self, method: &MethodImage) -> Result<(), ImageError> {
        self.str(&method.name)?;
        self.u8(method.flags.bits());
        self.signature(&method.params, &method.return_type)?;
        self.u16(method.frame_size);
        self.bytes(&method.code, "method body")
    }

    fn signature(&mut self, params: &[RuntimeType], return_type: &RuntimeType) -> Result<(), ImageError> {
        let count = u8::try_from(params.len()).map_err(|_| ImageError::TooLarge {
            what: "parameter list",
        })?;
        self.u8(count);
        for param in params {
            self.ty(param);
        }
        self.ty(return_type);
        Ok(())
    }

    fn ty(&mut self, ty: &RuntimeType) {
        match ty {
            RuntimeType::Void => self.u8(TAG_VOID),
            RuntimeType::Boolean => self.u8(TAG_BOOL),
            RuntimeType::Char => self.u8(TAG_CHAR),
            RuntimeType::Int32 => self.u8(TAG_INT32),
            RuntimeType::Int64 => self.u8(TAG_INT64),
            RuntimeType::Single => self.u8(TAG_SINGLE),
            RuntimeType::Double => self.u8(TAG_DOUBLE),
            RuntimeType::String => self.u8(TAG_STRING),
            RuntimeType::Array(element) => {
                self.u8(TAG_ARRAY);
                self.ty(element);
            }
            RuntimeType::Nullable(inner) => {
                self.u8(TAG_NULLABLE);
                self.ty(inner);
            }
        }
    }

    fn constant(&mut self, constant: &Constant) -> Result<(), ImageError> {
        match constant {
            Constant::Int32(v) => {
                self.u8(CONST_INT32);
                self.payload.extend_from_slice(&v.to_be_bytes());
            }
            Constant::Int64(v) => {
                self.u8(CONST_INT64);
                self.payload.extend_from_slice(&v.to_be_bytes());
            }
            Constant::Float32(v) => {
                self.u8(CONST_FLOAT32);
                self.payload.extend_from_slice(&v.to_bits().to_be_bytes());
            }
            Constant::Float64(v) => {
                self.u8(CONST_FLOAT64);
                self.payload.extend_from_slice(&v.to_bits().to_be_bytes());
            }
            Constant::Char(v) => {
                self.u8(CONST_CHAR);
                self.payload.extend_from_slice(&u32::from(*v).to_be_bytes());
            }
            Constant::String(v) => {
                self.u8(CONST_STRING);
                self.str(v)?;
            }
        }
        Ok(())
    }

    fn str(&mut self, value: &str) -> Result<(), ImageError> {
        self.bytes(value.as_bytes(), "string")
    }

    fn bytes(&mut self, value: &[u8], what: &'static str) -> Result<(), ImageError> {
        let len = u32::try_from(value.len()).map_err(|_| ImageError::TooLarge { what })?;
        self.payload.extend_from_slice(&len.to_be_bytes());
        self.payload.extend_from_slice(value);
        Ok(())
    }

    fn count_u16(&mut self, count: usize, what: &'static str) -> Result<(), ImageError> {
        let count = u16::try_from(count).map_err(|_| ImageError::TooLarge { what })?;
        self.u16(count);
        Ok(())
    }

    fn u8(&mut self, value: u8) {
        self.payload.push(value);
    }

    fn u16(&mut self, value: u16) {
        self.payload.extend_from_slice(&value.to_be_bytes());
    }
}
