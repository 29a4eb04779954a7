//! Schemas describing the shape of loaded data
//!
//! A schema is a tree of [`SchemaNode`]s.  Each node says what kind of YAML
//! value is expected, how many bytes the bound value occupies, and how it is
//! constrained.  Mappings list their fields as [`FieldSchema`]s which say at
//! which byte offset of the owning record each value lives.
//!
//! Schemas are checked once, when wrapped in a [`Schema`].  Loading and
//! saving only ever see checked schemas.
//!
//! ```
//! use shaped_yaml::{FieldSchema, NodeFlags, Schema, SchemaNode};
//!
//! let person = SchemaNode::mapping(
//!     16,
//!     vec![
//!         FieldSchema::new("name", 0, SchemaNode::string(1, 10)),
//!         FieldSchema::new("age", 8, SchemaNode::uint(4).with_flags(NodeFlags::OPTIONAL)),
//!     ],
//! )
//! .with_flags(NodeFlags::POINTER);
//! let schema = Schema::new(person).unwrap();
//! assert_eq!(schema.root().data_size(), 16);
//! ```

use std::collections::HashSet;
use std::ops::{BitOr, BitOrAssign};
use std::sync::Arc;

use crate::error::{Error, ErrorKind};

/// Bytes a pointer slot occupies in its owning record
pub const POINTER_SIZE: usize = std::mem::size_of::<usize>();

/// Maximum count meaning "no upper bound"
pub const UNLIMITED: usize = usize::MAX;

const OPTIONAL_BIT: u32 = 1 << 0;
const POINTER_BIT: u32 = 1 << 1;
const NULL_BIT: u32 = 1 << 2;
const NULL_STR_BIT: u32 = 1 << 3;
const STRICT_BIT: u32 = 1 << 4;
const BLOCK_BIT: u32 = 1 << 5;
const FLOW_BIT: u32 = 1 << 6;
const CASE_SENSITIVE_BIT: u32 = 1 << 7;
const CASE_INSENSITIVE_BIT: u32 = 1 << 8;

/// Behaviour flags attached to a schema node
///
/// The nullable flags are compositions: [`NodeFlags::NULLABLE_STRING`]
/// includes [`NodeFlags::NULLABLE`], which includes [`NodeFlags::POINTER`].
///
/// ```
/// # use shaped_yaml::NodeFlags;
/// let flags = NodeFlags::NULLABLE_STRING | NodeFlags::OPTIONAL;
/// assert!(flags.contains(NodeFlags::POINTER));
/// assert!(flags.contains(NodeFlags::NULLABLE));
/// assert!(!NodeFlags::POINTER.contains(NodeFlags::NULLABLE));
/// ```
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NodeFlags {
    bits: u32,
}

impl NodeFlags {
    /// The field may be absent from a mapping
    pub const OPTIONAL: NodeFlags = NodeFlags { bits: OPTIONAL_BIT };
    /// The value is allocated and referenced from its slot
    pub const POINTER: NodeFlags = NodeFlags { bits: POINTER_BIT };
    /// An empty scalar loads as a null reference
    pub const NULLABLE: NodeFlags = Self::POINTER.union(NodeFlags { bits: NULL_BIT });
    /// As [`NodeFlags::NULLABLE`], and `null`, `Null`, `NULL` and `~` are null too
    pub const NULLABLE_STRING: NodeFlags = Self::NULLABLE.union(NodeFlags { bits: NULL_STR_BIT });
    /// Only symbolic names are accepted for enums and flags
    pub const STRICT: NodeFlags = NodeFlags { bits: STRICT_BIT };
    /// Emit this collection in block style
    pub const BLOCK_STYLE: NodeFlags = NodeFlags { bits: BLOCK_BIT };
    /// Emit this collection in flow style
    pub const FLOW_STYLE: NodeFlags = NodeFlags { bits: FLOW_BIT };
    /// Compare keys and names exactly
    pub const CASE_SENSITIVE: NodeFlags = NodeFlags {
        bits: CASE_SENSITIVE_BIT,
    };
    /// Compare keys and names ignoring ASCII case; wins over `CASE_SENSITIVE`
    pub const CASE_INSENSITIVE: NodeFlags = NodeFlags {
        bits: CASE_INSENSITIVE_BIT,
    };

    /// No flags at all
    #[must_use]
    pub const fn empty() -> Self {
        NodeFlags { bits: 0 }
    }

    /// The raw bits
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.bits
    }

    /// The flags present in either set
    #[must_use]
    pub const fn union(self, other: NodeFlags) -> Self {
        NodeFlags {
            bits: self.bits | other.bits,
        }
    }

    /// Whether every flag of `other` is present
    #[must_use]
    pub const fn contains(self, other: NodeFlags) -> bool {
        (self.bits & other.bits) == other.bits
    }

    /// Add the flags of `other`
    pub fn insert(&mut self, other: NodeFlags) {
        self.bits |= other.bits;
    }

    /// Whether no flag is set
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.bits == 0
    }
}

impl BitOr for NodeFlags {
    type Output = NodeFlags;

    fn bitor(self, rhs: NodeFlags) -> NodeFlags {
        self.union(rhs)
    }
}

impl BitOrAssign for NodeFlags {
    fn bitor_assign(&mut self, rhs: NodeFlags) {
        self.insert(rhs);
    }
}

/// A symbolic name for an enum value
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumValue {
    /// The name as written in YAML
    pub name: String,
    /// The signed value stored
    pub value: i64,
}

/// A symbolic name for a flag value
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlagValue {
    /// The name as written in YAML
    pub name: String,
    /// The bits this name sets
    pub value: u64,
}

/// A named run of bits within a bitfield
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitDef {
    /// The key used in YAML
    pub name: String,
    /// Index of the least significant bit
    pub offset: u32,
    /// Number of bits
    pub width: u32,
}

impl BitDef {
    /// The largest value this run of bits can hold
    pub fn max_value(&self) -> u64 {
        if self.width >= 64 {
            u64::MAX
        } else {
            (1u64 << self.width) - 1
        }
    }
}

/// Entry schema and bounds of a sequence
#[derive(Clone, Debug, PartialEq)]
pub struct SequenceSchema {
    entry: Box<SchemaNode>,
    min: usize,
    max: usize,
}

impl SequenceSchema {
    /// The schema of every entry
    pub fn entry(&self) -> &SchemaNode {
        &self.entry
    }

    /// Fewest entries permitted
    pub fn min(&self) -> usize {
        self.min
    }

    /// Most entries permitted, [`UNLIMITED`] for no limit
    pub fn max(&self) -> usize {
        self.max
    }

    /// Bytes between consecutive entries
    pub fn stride(&self) -> usize {
        self.entry.slot_size()
    }
}

/// What kind of value a node expects, with its kind specific details
#[derive(Clone, Debug, PartialEq)]
pub enum Kind {
    /// A signed integer
    Int,
    /// An unsigned integer
    Uint,
    /// A boolean
    Bool,
    /// An IEEE float of 4 or 8 bytes
    Float,
    /// A string with byte length bounds
    String {
        /// Shortest permitted byte length
        min: usize,
        /// Longest permitted byte length
        max: usize,
    },
    /// One of a set of names, stored as a signed integer
    Enum(Vec<EnumValue>),
    /// A sequence of names, stored as the OR of their values
    Flags(Vec<FlagValue>),
    /// A mapping onto fields of a record
    Mapping(Vec<FieldSchema>),
    /// A mapping of names to small unsigned values packed in one integer
    Bitfield(Vec<BitDef>),
    /// A sequence with a variable entry count
    Sequence(SequenceSchema),
    /// A sequence with exactly `min` entries
    SequenceFixed(SequenceSchema),
    /// Any value, consumed and discarded
    Ignore,
}

impl Kind {
    /// A short name for the kind, for diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Kind::Int => "int",
            Kind::Uint => "uint",
            Kind::Bool => "bool",
            Kind::Float => "float",
            Kind::String { .. } => "string",
            Kind::Enum(_) => "enum",
            Kind::Flags(_) => "flags",
            Kind::Mapping(_) => "mapping",
            Kind::Bitfield(_) => "bitfield",
            Kind::Sequence(_) => "sequence",
            Kind::SequenceFixed(_) => "fixed sequence",
            Kind::Ignore => "ignore",
        }
    }
}

/// One node of a schema
#[derive(Clone, Debug, PartialEq)]
pub struct SchemaNode {
    kind: Kind,
    flags: NodeFlags,
    data_size: usize,
}

impl SchemaNode {
    fn new(kind: Kind, data_size: usize) -> Self {
        Self {
            kind,
            flags: NodeFlags::empty(),
            data_size,
        }
    }

    /// A signed integer of `size` bytes
    pub fn int(size: usize) -> Self {
        Self::new(Kind::Int, size)
    }

    /// An unsigned integer of `size` bytes
    pub fn uint(size: usize) -> Self {
        Self::new(Kind::Uint, size)
    }

    /// A boolean stored in `size` bytes
    pub fn boolean(size: usize) -> Self {
        Self::new(Kind::Bool, size)
    }

    /// A float of `size` bytes, 4 or 8
    pub fn float(size: usize) -> Self {
        Self::new(Kind::Float, size)
    }

    /// An allocated string of `min..=max` bytes
    pub fn string(min: usize, max: usize) -> Self {
        Self::new(Kind::String { min, max }, 0).with_flags(NodeFlags::POINTER)
    }

    /// A NUL terminated string stored inline in `size` bytes
    ///
    /// `size` must leave room for the terminator after `max` bytes.
    pub fn inline_string(size: usize, min: usize, max: usize) -> Self {
        Self::new(Kind::String { min, max }, size)
    }

    /// An enum stored as a signed integer of `size` bytes
    ///
    /// ```
    /// # use shaped_yaml::SchemaNode;
    /// let colour = SchemaNode::enumeration(4, [("red", 0), ("green", 1), ("blue", 2)]);
    /// assert_eq!(colour.kind().name(), "enum");
    /// ```
    pub fn enumeration<I, S>(size: usize, values: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        let values = values
            .into_iter()
            .map(|(name, value)| EnumValue {
                name: name.into(),
                value,
            })
            .collect();
        Self::new(Kind::Enum(values), size)
    }

    /// A set of flags stored as an unsigned integer of `size` bytes
    pub fn flags<I, S>(size: usize, values: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let values = values
            .into_iter()
            .map(|(name, value)| FlagValue {
                name: name.into(),
                value,
            })
            .collect();
        Self::new(Kind::Flags(values), size)
    }

    /// A mapping onto a record of `size` bytes
    pub fn mapping(size: usize, fields: Vec<FieldSchema>) -> Self {
        Self::new(Kind::Mapping(fields), size)
    }

    /// A bitfield packed into an unsigned integer of `size` bytes
    ///
    /// Each definition is `(name, bit offset, bit width)`.
    pub fn bitfield<I, S>(size: usize, bits: I) -> Self
    where
        I: IntoIterator<Item = (S, u32, u32)>,
        S: Into<String>,
    {
        let bits = bits
            .into_iter()
            .map(|(name, offset, width)| BitDef {
                name: name.into(),
                offset,
                width,
            })
            .collect();
        Self::new(Kind::Bitfield(bits), size)
    }

    /// A sequence of `min..=max` entries, always allocated
    pub fn sequence(entry: SchemaNode, min: usize, max: usize) -> Self {
        let stride = entry.slot_size();
        Self::new(
            Kind::Sequence(SequenceSchema {
                entry: Box::new(entry),
                min,
                max,
            }),
            stride,
        )
        .with_flags(NodeFlags::POINTER)
    }

    /// A sequence of exactly `count` entries, stored inline unless
    /// [`NodeFlags::POINTER`] is added
    pub fn sequence_fixed(entry: SchemaNode, count: usize) -> Self {
        Self::sequence_fixed_bounds(entry, count, count)
    }

    /// A fixed sequence given explicit bounds
    ///
    /// Registration rejects bounds which differ; this exists so schemas
    /// assembled from external descriptions can be checked rather than
    /// silently corrected.
    pub fn sequence_fixed_bounds(entry: SchemaNode, min: usize, max: usize) -> Self {
        let size = entry.slot_size().saturating_mul(max);
        Self::new(
            Kind::SequenceFixed(SequenceSchema {
                entry: Box::new(entry),
                min,
                max,
            }),
            size,
        )
    }

    /// Any value, skipped on load and never saved
    pub fn ignore() -> Self {
        Self::new(Kind::Ignore, 0)
    }

    /// Add flags to this node
    #[must_use]
    pub fn with_flags(mut self, flags: NodeFlags) -> Self {
        self.flags.insert(flags);
        self
    }

    /// What this node expects
    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    /// The node's flags
    pub fn node_flags(&self) -> NodeFlags {
        self.flags
    }

    /// Bytes occupied by the value itself
    pub fn data_size(&self) -> usize {
        self.data_size
    }

    /// Bytes this node occupies in the record which holds it
    pub fn slot_size(&self) -> usize {
        if self.is_pointer() {
            POINTER_SIZE
        } else {
            self.data_size
        }
    }

    /// Whether the value is allocated and referenced from its slot
    pub fn is_pointer(&self) -> bool {
        self.flags.contains(NodeFlags::POINTER)
    }

    /// Whether the value may be absent from its mapping
    pub fn is_optional(&self) -> bool {
        self.flags.contains(NodeFlags::OPTIONAL)
    }

    /// Whether an empty scalar loads as null
    pub fn is_nullable(&self) -> bool {
        self.flags.contains(NodeFlags::NULLABLE)
    }

    /// Whether the null spellings load as null
    pub fn is_nullable_string(&self) -> bool {
        self.flags.contains(NodeFlags::NULLABLE_STRING)
    }

    /// Whether only symbolic names are accepted
    pub fn is_strict(&self) -> bool {
        self.flags.contains(NodeFlags::STRICT)
    }
}

/// The location of a sequence's entry count within the owning record
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CountField {
    /// Byte offset of the count
    pub offset: usize,
    /// Width of the count in bytes
    pub size: usize,
}

/// One field of a mapping
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSchema {
    key: String,
    value: SchemaNode,
    data_offset: usize,
    count: Option<CountField>,
}

impl FieldSchema {
    /// A field whose value lives at `data_offset` in the owning record
    pub fn new<S: Into<String>>(key: S, data_offset: usize, value: SchemaNode) -> Self {
        Self {
            key: key.into(),
            value,
            data_offset,
            count: None,
        }
    }

    /// A variable sequence field whose entry count lives alongside it
    ///
    /// ```
    /// # use shaped_yaml::{FieldSchema, SchemaNode};
    /// let ports = FieldSchema::sequence("ports", 0, 8, 4, SchemaNode::uint(2), 1, 16);
    /// assert_eq!(ports.count().unwrap().offset, 8);
    /// ```
    pub fn sequence<S: Into<String>>(
        key: S,
        data_offset: usize,
        count_offset: usize,
        count_size: usize,
        entry: SchemaNode,
        min: usize,
        max: usize,
    ) -> Self {
        Self {
            key: key.into(),
            value: SchemaNode::sequence(entry, min, max),
            data_offset,
            count: Some(CountField {
                offset: count_offset,
                size: count_size,
            }),
        }
    }

    /// Attach a count location to a field built from a sequence node
    #[must_use]
    pub fn with_count(mut self, offset: usize, size: usize) -> Self {
        self.count = Some(CountField { offset, size });
        self
    }

    /// The YAML key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The schema of the field's value
    pub fn value(&self) -> &SchemaNode {
        &self.value
    }

    /// Byte offset of the field's slot in the owning record
    pub fn data_offset(&self) -> usize {
        self.data_offset
    }

    /// Where the entry count lives, for sequence fields
    pub fn count(&self) -> Option<&CountField> {
        self.count.as_ref()
    }
}

/// A checked schema ready for loading and saving
///
/// Cloning is cheap and a schema may be shared between threads.
#[derive(Clone, Debug)]
pub struct Schema {
    root: Arc<SchemaNode>,
}

impl Schema {
    /// Check a schema tree and wrap it for use
    ///
    /// ```
    /// # use shaped_yaml::{ErrorKind, Schema, SchemaNode};
    /// let err = Schema::new(SchemaNode::sequence(SchemaNode::int(4), 3, 1)).unwrap_err();
    /// assert_eq!(err.kind(), ErrorKind::BadMinMaxSchema);
    /// ```
    pub fn new(root: SchemaNode) -> Result<Self, Error> {
        check_node(&root, Position::Root)?;
        tracing::debug!(kind = root.kind().name(), "registered schema");
        Ok(Self {
            root: Arc::new(root),
        })
    }

    /// The root node
    pub fn root(&self) -> &SchemaNode {
        &self.root
    }
}

#[derive(Copy, Clone)]
enum Position<'a> {
    Root,
    Field(&'a FieldSchema),
    Entry,
}

fn schema_error(kind: ErrorKind, message: String) -> Error {
    Error::new(kind).with_message(message)
}

fn check_width(node: &SchemaNode, allowed: &[usize]) -> Result<(), Error> {
    if allowed.contains(&node.data_size) {
        Ok(())
    } else {
        Err(schema_error(
            ErrorKind::InvalidDataSize,
            format!(
                "{} of {} bytes is not supported",
                node.kind.name(),
                node.data_size
            ),
        ))
    }
}

const INT_WIDTHS: &[usize] = &[1, 2, 4, 8];
const FLOAT_WIDTHS: &[usize] = &[4, 8];

fn fold_key(key: &str, insensitive: bool) -> String {
    if insensitive {
        key.to_ascii_lowercase()
    } else {
        key.to_string()
    }
}

fn check_node(node: &SchemaNode, position: Position<'_>) -> Result<(), Error> {
    match &node.kind {
        Kind::Int | Kind::Uint | Kind::Bool => check_width(node, INT_WIDTHS)?,
        Kind::Float => check_width(node, FLOAT_WIDTHS)?,
        Kind::String { min, max } => {
            if min > max {
                return Err(schema_error(
                    ErrorKind::BadMinMaxSchema,
                    format!("string minimum {} exceeds maximum {}", min, max),
                ));
            }
            if !node.is_pointer() && *max >= node.data_size {
                return Err(schema_error(
                    ErrorKind::BadMinMaxSchema,
                    format!(
                        "inline string of {} bytes cannot hold {} bytes and a terminator",
                        node.data_size, max
                    ),
                ));
            }
        }
        Kind::Enum(values) => {
            check_width(node, INT_WIDTHS)?;
            if values.is_empty() {
                return Err(schema_error(
                    ErrorKind::BadTypeInSchema,
                    "enum has no values".into(),
                ));
            }
        }
        Kind::Flags(values) => {
            check_width(node, INT_WIDTHS)?;
            if values.is_empty() {
                return Err(schema_error(
                    ErrorKind::BadTypeInSchema,
                    "flags have no values".into(),
                ));
            }
        }
        Kind::Bitfield(bits) => {
            check_width(node, INT_WIDTHS)?;
            let capacity = 8 * node.data_size as u64;
            for bit in bits {
                if bit.width == 0 || u64::from(bit.offset) + u64::from(bit.width) > capacity {
                    return Err(schema_error(
                        ErrorKind::BadBitValInSchema,
                        format!(
                            "bits `{}` at offset {} width {} do not fit in {} bits",
                            bit.name, bit.offset, bit.width, capacity
                        ),
                    ));
                }
            }
        }
        Kind::Mapping(fields) => {
            let insensitive = node.flags.contains(NodeFlags::CASE_INSENSITIVE);
            let mut keys = HashSet::new();
            for field in fields {
                if !keys.insert(fold_key(&field.key, insensitive)) {
                    return Err(schema_error(
                        ErrorKind::BadTypeInSchema,
                        format!("duplicate field key `{}`", field.key),
                    ));
                }
                let end = field.data_offset.checked_add(field.value.slot_size());
                if end.map_or(true, |end| end > node.data_size) {
                    return Err(schema_error(
                        ErrorKind::BadTypeInSchema,
                        format!(
                            "field `{}` does not fit in a record of {} bytes",
                            field.key, node.data_size
                        ),
                    ));
                }
                if let Some(count) = field.count {
                    let end = count.offset.checked_add(count.size);
                    if end.map_or(true, |end| end > node.data_size) {
                        return Err(schema_error(
                            ErrorKind::BadTypeInSchema,
                            format!(
                                "count of `{}` does not fit in a record of {} bytes",
                                field.key, node.data_size
                            ),
                        ));
                    }
                }
                check_node(&field.value, Position::Field(field))?;
            }
        }
        Kind::Sequence(seq) => {
            check_bounds(seq)?;
            match position {
                Position::Entry => {
                    return Err(schema_error(
                        ErrorKind::SequenceInSequence,
                        "variable sequence as a sequence entry".into(),
                    ))
                }
                Position::Field(field) => match field.count {
                    Some(count) => {
                        if !INT_WIDTHS.contains(&count.size) {
                            return Err(schema_error(
                                ErrorKind::InvalidDataSize,
                                format!(
                                    "sequence count of {} bytes for `{}` is not supported",
                                    count.size, field.key
                                ),
                            ));
                        }
                    }
                    None => {
                        return Err(schema_error(
                            ErrorKind::BadTypeInSchema,
                            format!("sequence field `{}` has no count field", field.key),
                        ))
                    }
                },
                Position::Root => {}
            }
            check_node(&seq.entry, Position::Entry)?;
        }
        Kind::SequenceFixed(seq) => {
            check_bounds(seq)?;
            if seq.min != seq.max {
                return Err(schema_error(
                    ErrorKind::BadMinMaxSchema,
                    format!(
                        "fixed sequence minimum {} differs from maximum {}",
                        seq.min, seq.max
                    ),
                ));
            }
            check_node(&seq.entry, Position::Entry)?;
        }
        Kind::Ignore => {}
    }
    Ok(())
}

fn check_bounds(seq: &SequenceSchema) -> Result<(), Error> {
    if seq.min > seq.max {
        Err(schema_error(
            ErrorKind::BadMinMaxSchema,
            format!(
                "sequence minimum {} exceeds maximum {}",
                seq.min, seq.max
            ),
        ))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn kind_of(node: SchemaNode) -> ErrorKind {
        Schema::new(node.with_flags(NodeFlags::POINTER))
            .unwrap_err()
            .kind()
    }

    #[test]
    fn nullable_implies_pointer() {
        let node = SchemaNode::int(4).with_flags(NodeFlags::NULLABLE);
        assert!(node.is_pointer());
        assert!(node.is_nullable());
        assert!(!node.is_nullable_string());
        assert_eq!(node.slot_size(), POINTER_SIZE);
    }

    #[test]
    fn widths() {
        assert_eq!(kind_of(SchemaNode::int(3)), ErrorKind::InvalidDataSize);
        assert_eq!(kind_of(SchemaNode::float(2)), ErrorKind::InvalidDataSize);
        assert!(Schema::new(SchemaNode::float(4).with_flags(NodeFlags::POINTER)).is_ok());
    }

    #[test]
    fn fixed_needs_equal_bounds() {
        assert_eq!(
            kind_of(SchemaNode::sequence_fixed_bounds(SchemaNode::int(4), 2, 3)),
            ErrorKind::BadMinMaxSchema
        );
    }

    #[test]
    fn nested_variable_sequence() {
        let inner = SchemaNode::sequence(SchemaNode::int(4), 0, 4);
        assert_eq!(
            kind_of(SchemaNode::sequence(inner.clone(), 0, 4)),
            ErrorKind::SequenceInSequence
        );
        assert_eq!(
            kind_of(SchemaNode::sequence_fixed(inner, 2)),
            ErrorKind::SequenceInSequence
        );
        let fixed = SchemaNode::sequence_fixed(SchemaNode::int(4), 2);
        assert!(Schema::new(SchemaNode::sequence(fixed, 0, 4)).is_ok());
    }

    #[test]
    fn bitfield_bounds() {
        assert_eq!(
            kind_of(SchemaNode::bitfield(1, [("a", 4, 5)])),
            ErrorKind::BadBitValInSchema
        );
        assert!(Schema::new(
            SchemaNode::bitfield(8, [("all", 0, 64)]).with_flags(NodeFlags::POINTER)
        )
        .is_ok());
    }

    #[test]
    fn enum_needs_values() {
        let empty: [(&str, i64); 0] = [];
        assert_eq!(
            kind_of(SchemaNode::enumeration(4, empty)),
            ErrorKind::BadTypeInSchema
        );
    }

    #[test]
    fn duplicate_keys_honour_case() {
        let fields = || {
            vec![
                FieldSchema::new("Key", 0, SchemaNode::int(4)),
                FieldSchema::new("key", 4, SchemaNode::int(4)),
            ]
        };
        assert!(Schema::new(SchemaNode::mapping(8, fields()).with_flags(NodeFlags::POINTER)).is_ok());
        assert_eq!(
            kind_of(SchemaNode::mapping(8, fields()).with_flags(NodeFlags::CASE_INSENSITIVE)),
            ErrorKind::BadTypeInSchema
        );
    }

    #[test]
    fn inline_string_needs_terminator() {
        assert_eq!(
            kind_of(SchemaNode::mapping(
                8,
                vec![FieldSchema::new("s", 0, SchemaNode::inline_string(8, 0, 8))]
            )),
            ErrorKind::BadMinMaxSchema
        );
    }

    #[test]
    fn field_must_fit_record() {
        assert_eq!(
            kind_of(SchemaNode::mapping(
                4,
                vec![FieldSchema::new("big", 0, SchemaNode::uint(8))]
            )),
            ErrorKind::BadTypeInSchema
        );
    }

    #[test]
    fn count_must_fit_record() {
        let field = FieldSchema::sequence("xs", 0, 100, 4, SchemaNode::int(4), 0, 2);
        assert_eq!(
            kind_of(SchemaNode::mapping(8, vec![field])),
            ErrorKind::BadTypeInSchema
        );
        let field = FieldSchema::sequence("xs", 0, usize::MAX, 4, SchemaNode::int(4), 0, 2);
        assert_eq!(
            kind_of(SchemaNode::mapping(8, vec![field])),
            ErrorKind::BadTypeInSchema
        );
    }

    #[test]
    fn sequence_field_needs_count() {
        let field = FieldSchema::new("list", 0, SchemaNode::sequence(SchemaNode::int(4), 0, 2));
        assert_eq!(
            kind_of(SchemaNode::mapping(16, vec![field.clone()])),
            ErrorKind::BadTypeInSchema
        );
        let field = field.with_count(8, 4);
        assert!(Schema::new(SchemaNode::mapping(16, vec![field]).with_flags(NodeFlags::POINTER)).is_ok());
    }

    #[test]
    fn schema_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Schema>();
    }
}
