//! Errors raised while registering schemas, loading and saving
//!

use std::fmt::{self, Display};

use thiserror::Error;

use crate::event::Marker;

/// The closed set of reasons a load, save, or schema registration can fail
///
/// Every [`Error`] carries exactly one of these.  The kind is stable and can
/// be rendered to a fixed string with [`strerror()`] without any context.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Memory could not be allocated for loaded data
    OutOfMemory,
    /// An alias was found but aliases are disabled
    Alias,
    /// An alias referred to an anchor which was never completed
    InvalidAlias,
    /// A mapping key is not part of the schema
    InvalidKey,
    /// A scalar could not be converted to the value the schema wants
    InvalidValue,
    /// The event stream did not have the shape the schema wants
    UnexpectedEvent,
    /// A string is shorter than the schema permits
    StringLengthMin,
    /// A string is longer than the schema permits
    StringLengthMax,
    /// A value width is not supported for its kind
    InvalidDataSize,
    /// The top level of a schema must be a pointer
    TopLevelNonPointer,
    /// A schema contains a type or layout which cannot be used
    BadTypeInSchema,
    /// A schema contains a minimum greater than its maximum
    BadMinMaxSchema,
    /// A bitfield definition does not fit its backing integer
    BadBitValInSchema,
    /// The top level sequence count is inconsistent with the data
    BadParamSeqCount,
    /// Data required for saving was null
    BadParamNullData,
    /// No configuration was supplied
    BadParamNullConfig,
    /// No schema was supplied
    BadParamNullSchema,
    /// A sequence has fewer entries than the schema permits
    SequenceEntriesMin,
    /// A sequence has more entries than the schema permits
    SequenceEntriesMax,
    /// A fixed sequence does not have exactly its required count
    SequenceFixedCount,
    /// A variable length sequence is nested directly in another sequence
    SequenceInSequence,
    /// A mapping lacks a field which is not optional
    MappingFieldMissing,
    /// The YAML emitter reported a failure
    EmitterError,
    /// The YAML parser reported a failure
    ParserError,
}

impl ErrorKind {
    /// The fixed human readable text for this kind of error
    ///
    /// ```
    /// # use shaped_yaml::ErrorKind;
    /// assert_eq!(ErrorKind::InvalidKey.as_str(), "Invalid key");
    /// ```
    pub fn as_str(self) -> &'static str {
        use ErrorKind::*;
        match self {
            OutOfMemory => "Memory allocation failed",
            Alias => "YAML alias unsupported",
            InvalidAlias => "Invalid YAML alias",
            InvalidKey => "Invalid key",
            InvalidValue => "Invalid value",
            UnexpectedEvent => "Unexpected event",
            StringLengthMin => "String length too short",
            StringLengthMax => "String length too long",
            InvalidDataSize => "Data size must be 0 < X <= 8 bytes",
            TopLevelNonPointer => "Top-level schema value must be pointer",
            BadTypeInSchema => "Schema contains invalid type",
            BadMinMaxSchema => "Bad schema: min exceeds max",
            BadBitValInSchema => "Bad schema: bit value out of range",
            BadParamSeqCount => "Bad parameter: Unexpected sequence count",
            BadParamNullData => "Bad parameter: NULL data",
            BadParamNullConfig => "Bad parameter: NULL config",
            BadParamNullSchema => "Bad parameter: NULL schema",
            SequenceEntriesMin => "Sequence with too few entries",
            SequenceEntriesMax => "Sequence with too many entries",
            SequenceFixedCount => "Sequence fixed has unequal min max",
            SequenceInSequence => "Non-fixed sequence in sequence",
            MappingFieldMissing => "Missing required mapping field",
            EmitterError => "Emitter error",
            ParserError => "Parser error",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Render an error kind to its fixed human readable string
///
/// ```
/// # use shaped_yaml::{strerror, ErrorKind};
/// assert_eq!(strerror(ErrorKind::MappingFieldMissing), "Missing required mapping field");
/// ```
pub fn strerror(kind: ErrorKind) -> &'static str {
    kind.as_str()
}

/// One step from a parent node to a child node
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// The value of the given key in a mapping
    Key(String),
    /// The entry at the given index in a sequence
    Index(usize),
}

/// The location of a node within a document, as keys and indices from the root
///
/// ```
/// # use shaped_yaml::{PathSegment, YamlPath};
/// let path: YamlPath = vec![PathSegment::Key("servers".into()), PathSegment::Index(2)].into();
/// assert_eq!(path.to_string(), "/servers/2");
/// assert_eq!(YamlPath::root().to_string(), "/");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct YamlPath(Vec<PathSegment>);

impl YamlPath {
    /// The path of the document's root node
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Whether this path refers to the root node
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The segments which make up this path
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub(crate) fn push(&mut self, segment: PathSegment) {
        self.0.push(segment);
    }

    pub(crate) fn pop(&mut self) {
        self.0.pop();
    }
}

impl From<Vec<PathSegment>> for YamlPath {
    fn from(value: Vec<PathSegment>) -> Self {
        Self(value)
    }
}

impl Display for YamlPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.0 {
            match segment {
                PathSegment::Key(key) => write!(f, "/{}", key)?,
                PathSegment::Index(index) => write!(f, "/{}", index)?,
            }
        }
        Ok(())
    }
}

/// An error from registering a schema, loading, or saving
///
/// Loading and saving stop at the first fault, so a call produces at most
/// one of these.  The kind says what went wrong, the path and marker say
/// where.
///
/// ```
/// # use shaped_yaml::{Error, ErrorKind};
/// let err = Error::new(ErrorKind::InvalidValue).with_message("`x` is not an integer");
/// assert_eq!(err.to_string(), "/: Invalid value: `x` is not an integer");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{}{}: {kind}{}", location(.mark), .path, detail(.message))]
pub struct Error {
    kind: ErrorKind,
    path: YamlPath,
    mark: Option<Marker>,
    message: Option<String>,
}

fn location(mark: &Option<Marker>) -> String {
    match mark {
        Some(mark) => format!("{}: ", mark),
        None => String::new(),
    }
}

fn detail(message: &Option<String>) -> String {
    match message {
        Some(message) => format!(": {}", message),
        None => String::new(),
    }
}

impl Error {
    /// Create an error of the given kind at the root, with no detail
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            path: YamlPath::root(),
            mark: None,
            message: None,
        }
    }

    /// Attach a detail message
    pub fn with_message<S: Into<String>>(mut self, message: S) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach the path of the offending node
    pub fn with_path(mut self, path: YamlPath) -> Self {
        self.path = path;
        self
    }

    /// Attach the source position of the offending event
    pub fn with_mark(mut self, mark: Option<Marker>) -> Self {
        self.mark = mark;
        self
    }

    /// The kind of this error
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Where in the document the error was detected
    pub fn path(&self) -> &YamlPath {
        &self.path
    }

    /// Where in the source text the error was detected, if known
    pub fn mark(&self) -> Option<&Marker> {
        self.mark.as_ref()
    }

    /// The detail message, if any
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::new(kind)
    }
}
