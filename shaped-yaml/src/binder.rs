//! Reading and writing typed values at offsets within a record
//!
//! The binder knows nothing of schemas.  It is given an offset, a width and
//! a scalar kind, and moves a [`Value`] in or out of a [`Record`] without
//! touching any byte outside `offset..offset + size`.

use crate::error::{Error, ErrorKind};
use crate::record::Record;

/// How the bytes of a scalar are interpreted
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScalarKind {
    /// Two's complement, sign extended on read
    Int,
    /// Unsigned, zero extended on read
    Uint,
    /// Any non-zero value reads as true
    Bool,
    /// IEEE 754 binary32 or binary64
    Float,
}

/// A value moved through the binder
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Value {
    /// A signed integer
    Int(i64),
    /// An unsigned integer
    Uint(u64),
    /// A boolean
    Bool(bool),
    /// A float, narrowed to 32 bits when stored in 4 bytes
    Float(f64),
}

fn bad_size(kind: ScalarKind, size: usize) -> Error {
    Error::new(ErrorKind::InvalidDataSize)
        .with_message(format!("{:?} of {} bytes is not supported", kind, size))
}

/// Read the value of `kind` stored in `size` bytes at `offset`
///
/// ```
/// # use shaped_yaml::Record;
/// # use shaped_yaml::binder::{read_value, ScalarKind, Value};
/// let mut record = Record::new(4);
/// record.set_i16(0, -2).unwrap();
/// assert_eq!(read_value(&record, 0, 2, ScalarKind::Int).unwrap(), Value::Int(-2));
/// assert_eq!(read_value(&record, 0, 2, ScalarKind::Uint).unwrap(), Value::Uint(0xfffe));
/// ```
pub fn read_value(
    record: &Record,
    offset: usize,
    size: usize,
    kind: ScalarKind,
) -> Result<Value, Error> {
    let bytes = record.bytes_at(offset, size)?;
    let value = match kind {
        ScalarKind::Int => Value::Int(read_signed(bytes).ok_or_else(|| bad_size(kind, size))?),
        ScalarKind::Uint => {
            Value::Uint(read_unsigned(bytes).ok_or_else(|| bad_size(kind, size))?)
        }
        ScalarKind::Bool => {
            if read_unsigned(bytes).is_none() {
                return Err(bad_size(kind, size));
            }
            Value::Bool(bytes.iter().any(|b| *b != 0))
        }
        ScalarKind::Float => match size {
            4 => Value::Float(f64::from(f32::from_ne_bytes(array(bytes)?))),
            8 => Value::Float(f64::from_ne_bytes(array(bytes)?)),
            _ => return Err(bad_size(kind, size)),
        },
    };
    Ok(value)
}

/// Write `value` as `kind` into `size` bytes at `offset`
///
/// Integers are truncated to the width; callers check range first with
/// [`fits_signed()`] or [`fits_unsigned()`].
pub fn write_value(
    record: &mut Record,
    offset: usize,
    size: usize,
    kind: ScalarKind,
    value: Value,
) -> Result<(), Error> {
    let bytes = record.bytes_at_mut(offset, size)?;
    match (kind, value) {
        (ScalarKind::Int, Value::Int(v)) => write_integer(bytes, v as u64, kind),
        (ScalarKind::Uint, Value::Uint(v)) => write_integer(bytes, v, kind),
        (ScalarKind::Bool, Value::Bool(v)) => write_integer(bytes, u64::from(v), kind),
        (ScalarKind::Float, Value::Float(v)) => match size {
            4 => {
                bytes.copy_from_slice(&(v as f32).to_ne_bytes());
                Ok(())
            }
            8 => {
                bytes.copy_from_slice(&v.to_ne_bytes());
                Ok(())
            }
            _ => Err(bad_size(kind, size)),
        },
        (kind, value) => Err(Error::new(ErrorKind::InvalidValue)
            .with_message(format!("cannot store {:?} as {:?}", value, kind))),
    }
}

fn array<const N: usize>(bytes: &[u8]) -> Result<[u8; N], Error> {
    bytes
        .try_into()
        .map_err(|_| Error::new(ErrorKind::InvalidDataSize))
}

fn read_signed(bytes: &[u8]) -> Option<i64> {
    Some(match bytes.len() {
        1 => i64::from(i8::from_ne_bytes(bytes.try_into().ok()?)),
        2 => i64::from(i16::from_ne_bytes(bytes.try_into().ok()?)),
        4 => i64::from(i32::from_ne_bytes(bytes.try_into().ok()?)),
        8 => i64::from_ne_bytes(bytes.try_into().ok()?),
        _ => return None,
    })
}

fn read_unsigned(bytes: &[u8]) -> Option<u64> {
    Some(match bytes.len() {
        1 => u64::from(u8::from_ne_bytes(bytes.try_into().ok()?)),
        2 => u64::from(u16::from_ne_bytes(bytes.try_into().ok()?)),
        4 => u64::from(u32::from_ne_bytes(bytes.try_into().ok()?)),
        8 => u64::from_ne_bytes(bytes.try_into().ok()?),
        _ => return None,
    })
}

fn write_integer(bytes: &mut [u8], v: u64, kind: ScalarKind) -> Result<(), Error> {
    match bytes.len() {
        1 => bytes.copy_from_slice(&(v as u8).to_ne_bytes()),
        2 => bytes.copy_from_slice(&(v as u16).to_ne_bytes()),
        4 => bytes.copy_from_slice(&(v as u32).to_ne_bytes()),
        8 => bytes.copy_from_slice(&v.to_ne_bytes()),
        size => return Err(bad_size(kind, size)),
    }
    Ok(())
}

/// Whether `v` is representable as a signed integer of `size` bytes
pub fn fits_signed(v: i64, size: usize) -> bool {
    match size {
        1 => i8::try_from(v).is_ok(),
        2 => i16::try_from(v).is_ok(),
        4 => i32::try_from(v).is_ok(),
        8 => true,
        _ => false,
    }
}

/// Whether `v` is representable as an unsigned integer of `size` bytes
pub fn fits_unsigned(v: u64, size: usize) -> bool {
    match size {
        1 => u8::try_from(v).is_ok(),
        2 => u16::try_from(v).is_ok(),
        4 => u32::try_from(v).is_ok(),
        8 => true,
        _ => false,
    }
}

/// Read a NUL terminated string stored inline in `size` bytes
pub fn read_inline_str(record: &Record, offset: usize, size: usize) -> Result<&str, Error> {
    let bytes = record.bytes_at(offset, size)?;
    let end = bytes.iter().position(|b| *b == 0).ok_or_else(|| {
        Error::new(ErrorKind::StringLengthMax).with_message("inline string is not terminated")
    })?;
    std::str::from_utf8(&bytes[..end])
        .map_err(|e| Error::new(ErrorKind::InvalidValue).with_message(e.to_string()))
}

/// Write `text` inline into `size` bytes, NUL terminated and zero padded
///
/// Text holding a NUL byte is refused, as it would read back truncated.
pub fn write_inline_str(
    record: &mut Record,
    offset: usize,
    size: usize,
    text: &str,
) -> Result<(), Error> {
    if text.contains('\0') {
        return Err(Error::new(ErrorKind::InvalidValue)
            .with_message("inline string contains a NUL byte"));
    }
    if text.len() >= size {
        return Err(Error::new(ErrorKind::StringLengthMax).with_message(format!(
            "{} bytes do not fit an inline string of {} bytes",
            text.len(),
            size
        )));
    }
    let bytes = record.bytes_at_mut(offset, size)?;
    bytes.fill(0);
    bytes[..text.len()].copy_from_slice(text.as_bytes());
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sign_and_zero_extension() {
        let mut record = Record::new(8);
        write_value(&mut record, 0, 1, ScalarKind::Int, Value::Int(-1)).unwrap();
        assert_eq!(&record.as_bytes()[1..], &[0u8; 7]);
        assert_eq!(read_value(&record, 0, 1, ScalarKind::Int).unwrap(), Value::Int(-1));
        assert_eq!(
            read_value(&record, 0, 1, ScalarKind::Uint).unwrap(),
            Value::Uint(255)
        );
    }

    #[test]
    fn writes_stay_in_width() {
        let mut record = Record::new(8);
        record.set_u64(0, u64::MAX).unwrap();
        write_value(&mut record, 2, 2, ScalarKind::Uint, Value::Uint(0)).unwrap();
        assert_eq!(record.get_u16(0), Some(u16::MAX));
        assert_eq!(record.get_u16(2), Some(0));
        assert_eq!(record.get_u32(4), Some(u32::MAX));
    }

    #[test]
    fn bool_reads_any_nonzero() {
        let mut record = Record::new(4);
        record.set_u32(0, 0x0100).unwrap();
        assert_eq!(
            read_value(&record, 0, 4, ScalarKind::Bool).unwrap(),
            Value::Bool(true)
        );
        write_value(&mut record, 0, 1, ScalarKind::Bool, Value::Bool(true)).unwrap();
        assert_eq!(record.get_u8(0), Some(1));
    }

    #[test]
    fn floats() {
        let mut record = Record::new(12);
        write_value(&mut record, 0, 4, ScalarKind::Float, Value::Float(1.5)).unwrap();
        write_value(&mut record, 4, 8, ScalarKind::Float, Value::Float(-2.25)).unwrap();
        assert_eq!(record.get_f32(0), Some(1.5));
        assert_eq!(
            read_value(&record, 4, 8, ScalarKind::Float).unwrap(),
            Value::Float(-2.25)
        );
    }

    #[test]
    fn unsupported_sizes() {
        let mut record = Record::new(8);
        let err = read_value(&record, 0, 3, ScalarKind::Int).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDataSize);
        let err = write_value(&mut record, 0, 2, ScalarKind::Float, Value::Float(0.0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDataSize);
    }

    #[test]
    fn mismatched_value() {
        let mut record = Record::new(8);
        let err = write_value(&mut record, 0, 4, ScalarKind::Int, Value::Bool(true)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
    }

    #[test]
    fn ranges() {
        assert!(fits_signed(-128, 1));
        assert!(!fits_signed(128, 1));
        assert!(fits_unsigned(65535, 2));
        assert!(!fits_unsigned(65536, 2));
        assert!(!fits_unsigned(1, 3));
    }

    #[test]
    fn inline_strings() {
        let mut record = Record::new(8);
        write_inline_str(&mut record, 0, 6, "hello").unwrap();
        assert_eq!(read_inline_str(&record, 0, 6).unwrap(), "hello");
        let err = write_inline_str(&mut record, 0, 6, "hello!").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StringLengthMax);
        write_inline_str(&mut record, 0, 6, "hi").unwrap();
        assert_eq!(read_inline_str(&record, 0, 6).unwrap(), "hi");
        let err = write_inline_str(&mut record, 0, 6, "a\0b").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
        assert_eq!(read_inline_str(&record, 0, 6).unwrap(), "hi");
    }
}
