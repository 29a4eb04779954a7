//! Memory regions which loaded values are bound into
//!
//! A [`Record`] is an explicitly sized block of bytes together with a table
//! of [`Link`]s.  Inline values (integers, floats, inline strings, nested
//! non-pointer mappings) live in the bytes; pointer values live in the link
//! table, keyed by the byte offset of their slot.
//!
//! ```
//! use shaped_yaml::{Link, Record};
//!
//! let mut record = Record::new(16);
//! record.set_u32(0, 42).unwrap();
//! record.set_link(8, Link::Text("hello".into()));
//! assert_eq!(record.get_u32(0), Some(42));
//! assert_eq!(record.text(8), Some("hello"));
//! ```

use std::collections::BTreeMap;

use doc_comment::doc_comment;

use crate::error::{Error, ErrorKind};

/// The content of a pointer slot
#[derive(Clone, Debug, PartialEq)]
pub enum Link {
    /// A null reference
    Null,
    /// An allocated string
    Text(String),
    /// An allocated region
    Block(Record),
}

/// An explicitly sized region of bytes plus the allocations it owns
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    bytes: Vec<u8>,
    links: BTreeMap<usize, Link>,
}

fn out_of_memory(size: usize) -> Error {
    Error::new(ErrorKind::OutOfMemory).with_message(format!("allocating {} bytes", size))
}

impl Record {
    /// Create a zero filled record of `size` bytes
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
            links: BTreeMap::new(),
        }
    }

    /// Create a zero filled record, reporting allocation failure
    pub fn try_new(size: usize) -> Result<Self, Error> {
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(size)
            .map_err(|_| out_of_memory(size))?;
        bytes.resize(size, 0);
        Ok(Self {
            bytes,
            links: BTreeMap::new(),
        })
    }

    /// Size of the region in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the region has no bytes
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The raw bytes of the region
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Extend the region by `extra` zero bytes
    pub fn grow(&mut self, extra: usize) -> Result<(), Error> {
        self.bytes
            .try_reserve(extra)
            .map_err(|_| out_of_memory(extra))?;
        self.bytes.resize(self.bytes.len() + extra, 0);
        Ok(())
    }

    fn range(&self, offset: usize, size: usize) -> Result<std::ops::Range<usize>, Error> {
        match offset.checked_add(size) {
            Some(end) if end <= self.bytes.len() => Ok(offset..end),
            _ => Err(Error::new(ErrorKind::InvalidDataSize).with_message(format!(
                "{} bytes at offset {} lie outside a record of {} bytes",
                size,
                offset,
                self.bytes.len()
            ))),
        }
    }

    /// Borrow `size` bytes at `offset`
    pub fn bytes_at(&self, offset: usize, size: usize) -> Result<&[u8], Error> {
        let range = self.range(offset, size)?;
        Ok(&self.bytes[range])
    }

    /// Mutably borrow `size` bytes at `offset`
    pub fn bytes_at_mut(&mut self, offset: usize, size: usize) -> Result<&mut [u8], Error> {
        let range = self.range(offset, size)?;
        Ok(&mut self.bytes[range])
    }

    /// The link stored for the slot at `offset`, if one was ever set
    pub fn link(&self, offset: usize) -> Option<&Link> {
        self.links.get(&offset)
    }

    /// Store a link for the slot at `offset`, dropping any previous one
    pub fn set_link(&mut self, offset: usize, link: Link) {
        self.links.insert(offset, link);
    }

    /// Remove and return the link for the slot at `offset`
    pub fn take_link(&mut self, offset: usize) -> Option<Link> {
        self.links.remove(&offset)
    }

    /// The string referenced from `offset`, if it holds one
    pub fn text(&self, offset: usize) -> Option<&str> {
        match self.links.get(&offset) {
            Some(Link::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// The region referenced from `offset`, if it holds one
    pub fn block(&self, offset: usize) -> Option<&Record> {
        match self.links.get(&offset) {
            Some(Link::Block(block)) => Some(block),
            _ => None,
        }
    }

    /// The region referenced from `offset`, mutably
    pub fn block_mut(&mut self, offset: usize) -> Option<&mut Record> {
        match self.links.get_mut(&offset) {
            Some(Link::Block(block)) => Some(block),
            _ => None,
        }
    }

    /// Whether the slot at `offset` holds an explicit null
    pub fn is_null(&self, offset: usize) -> bool {
        matches!(self.links.get(&offset), Some(Link::Null))
    }

    /// Copy `child` into this region at `offset`, taking over its links
    pub(crate) fn splice(&mut self, offset: usize, child: Record) -> Result<(), Error> {
        let range = self.range(offset, child.bytes.len())?;
        self.bytes[range].copy_from_slice(&child.bytes);
        for (at, link) in child.links {
            self.links.insert(offset + at, link);
        }
        Ok(())
    }
}

macro_rules! record_number {
    ($t:ident, $get:ident, $set:ident) => {
        impl Record {
            doc_comment!(
                concat!(
                    "Read a native endian `",
                    stringify!($t),
                    r#"` stored at `offset`

Returns `None` if the value would lie outside the record.

```
# use shaped_yaml::Record;
let mut record = Record::new(16);
record."#,
                    stringify!($set),
                    r#"(8, 7 as "#,
                    stringify!($t),
                    r#").unwrap();
assert_eq!(record."#,
                    stringify!($get),
                    r#"(8), Some(7 as "#,
                    stringify!($t),
                    r#"));
assert_eq!(record."#,
                    stringify!($get),
                    r#"(15 + std::mem::size_of::<"#,
                    stringify!($t),
                    r#">()), None);
```"#
                ),
                pub fn $get(&self, offset: usize) -> Option<$t> {
                    let bytes = self
                        .bytes_at(offset, std::mem::size_of::<$t>())
                        .ok()?;
                    Some($t::from_ne_bytes(bytes.try_into().ok()?))
                }
            );

            doc_comment!(
                concat!(
                    "Write a native endian `",
                    stringify!($t),
                    "` at `offset`, failing if it would lie outside the record"
                ),
                pub fn $set(&mut self, offset: usize, value: $t) -> Result<(), Error> {
                    let bytes = self.bytes_at_mut(offset, std::mem::size_of::<$t>())?;
                    bytes.copy_from_slice(&value.to_ne_bytes());
                    Ok(())
                }
            );
        }
    };
}

record_number!(i8, get_i8, set_i8);
record_number!(i16, get_i16, set_i16);
record_number!(i32, get_i32, set_i32);
record_number!(i64, get_i64, set_i64);
record_number!(u8, get_u8, set_u8);
record_number!(u16, get_u16, set_u16);
record_number!(u32, get_u32, set_u32);
record_number!(u64, get_u64, set_u64);
record_number!(f32, get_f32, set_f32);
record_number!(f64, get_f64, set_f64);

/// The result of a load, and the input of a save
///
/// The root of every schema is a pointer, so a target holds the root's
/// [`Link`].  For a root sequence the entry count travels alongside it.
#[derive(Clone, Debug, PartialEq)]
pub struct Target {
    root: Link,
    seq_count: usize,
}

impl Target {
    /// A target whose root is the given link
    pub fn new(root: Link) -> Self {
        Self { root, seq_count: 0 }
    }

    /// A target whose root is an allocated region
    pub fn from_record(record: Record) -> Self {
        Self::new(Link::Block(record))
    }

    /// A target for a root sequence with `count` entries in `record`
    pub fn sequence(record: Record, count: usize) -> Self {
        Self {
            root: Link::Block(record),
            seq_count: count,
        }
    }

    /// A target with a null root
    pub fn null() -> Self {
        Self::new(Link::Null)
    }

    /// The root link
    pub fn root(&self) -> &Link {
        &self.root
    }

    /// The root region, if the root is one
    pub fn data(&self) -> Option<&Record> {
        match &self.root {
            Link::Block(record) => Some(record),
            _ => None,
        }
    }

    /// The root string, if the root is one
    pub fn text(&self) -> Option<&str> {
        match &self.root {
            Link::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Whether the root is null
    pub fn is_null(&self) -> bool {
        matches!(self.root, Link::Null)
    }

    /// Number of entries in a root sequence
    pub fn seq_count(&self) -> usize {
        self.seq_count
    }

    /// Give up the target, keeping its root link
    pub fn into_root(self) -> Link {
        self.root
    }

    /// Set the root sequence count
    pub fn set_seq_count(&mut self, count: usize) {
        self.seq_count = count;
    }
}
