//! Saving records out as YAML events
//!
//! Saving mirrors loading: the schema is walked top-down alongside the data,
//! with an explicit task stack instead of recursion.  Whatever the schema
//! says about a value is checked again here, so data which was built by
//! hand rather than loaded cannot produce a document which would fail to
//! load back.

use crate::binder::{self, ScalarKind, Value};
use crate::config::Config;
use crate::error::{Error, ErrorKind, PathSegment, YamlPath};
use crate::event::{Event, EventSink, ScalarStyle, Style};
use crate::record::{Link, Record, Target};
use crate::scalar;
use crate::schema::{Kind, NodeFlags, Schema, SchemaNode, SequenceSchema};

/// Where the data for a value is found
#[derive(Copy, Clone)]
enum Place<'a> {
    /// At an offset within a record
    Inline(&'a Record, usize),
    /// Behind a pointer slot, which may never have been set
    Linked(Option<&'a Link>),
}

fn place_of<'a>(node: &SchemaNode, record: &'a Record, offset: usize) -> Place<'a> {
    if node.is_pointer() {
        Place::Linked(record.link(offset))
    } else {
        Place::Inline(record, offset)
    }
}

enum Task<'a> {
    Value {
        node: &'a SchemaNode,
        place: Place<'a>,
        count: usize,
        segment: Option<PathSegment>,
    },
    Emit(Event),
    Leave,
}

fn invalid(message: String) -> Error {
    Error::new(ErrorKind::InvalidValue).with_message(message)
}

fn plain(text: String) -> Event {
    Event::Scalar {
        value: text,
        style: ScalarStyle::Plain,
        anchor: None,
    }
}

/// The layout a collection is written with
///
/// `FLOW_STYLE` wins over `BLOCK_STYLE`; with neither, the configuration's
/// default applies.
fn style_of(node: &SchemaNode, config: &Config) -> Style {
    let flags = node.node_flags();
    if flags.contains(NodeFlags::FLOW_STYLE) {
        Style::Flow
    } else if flags.contains(NodeFlags::BLOCK_STYLE) {
        Style::Block
    } else {
        config.default_style
    }
}

fn read_signed(record: &Record, offset: usize, size: usize) -> Result<i64, Error> {
    match binder::read_value(record, offset, size, ScalarKind::Int)? {
        Value::Int(v) => Ok(v),
        other => Err(invalid(format!("read {:?} for a signed integer", other))),
    }
}

fn read_unsigned(record: &Record, offset: usize, size: usize) -> Result<u64, Error> {
    match binder::read_value(record, offset, size, ScalarKind::Uint)? {
        Value::Uint(v) => Ok(v),
        other => Err(invalid(format!("read {:?} for an unsigned integer", other))),
    }
}

fn check_length(text: &str, min: usize, max: usize) -> Result<(), Error> {
    if text.len() < min {
        Err(Error::new(ErrorKind::StringLengthMin).with_message(format!(
            "length {} is below minimum {}",
            text.len(),
            min
        )))
    } else if text.len() > max {
        Err(Error::new(ErrorKind::StringLengthMax).with_message(format!(
            "length {} is above maximum {}",
            text.len(),
            max
        )))
    } else {
        Ok(())
    }
}

fn check_count(seq: &SequenceSchema, count: usize) -> Result<(), Error> {
    if count < seq.min() {
        Err(Error::new(ErrorKind::SequenceEntriesMin).with_message(format!(
            "{} entries, at least {} needed",
            count,
            seq.min()
        )))
    } else if count > seq.max() {
        Err(Error::new(ErrorKind::SequenceEntriesMax).with_message(format!(
            "{} entries, at most {} allowed",
            count,
            seq.max()
        )))
    } else {
        Ok(())
    }
}

struct Saver<'a, 'c, K> {
    config: &'c Config,
    sink: K,
    path: YamlPath,
    stack: Vec<Task<'a>>,
}

impl<'a, 'c, K: EventSink> Saver<'a, 'c, K> {
    fn emit(&mut self, event: Event) -> Result<(), Error> {
        tracing::trace!(?event, "save event");
        self.sink.emit(event)
    }

    fn run(&mut self, root: &'a SchemaNode, target: &'a Target) -> Result<(), Error> {
        let explicit = self.config.emit_document_delimiters;
        self.emit(Event::DocumentStart { explicit })?;
        self.stack.push(Task::Emit(Event::DocumentEnd { explicit }));
        self.stack.push(Task::Value {
            node: root,
            place: Place::Linked(Some(target.root())),
            count: target.seq_count(),
            segment: None,
        });
        while let Some(task) = self.stack.pop() {
            match task {
                Task::Emit(event) => self.emit(event)?,
                Task::Leave => {
                    self.path.pop();
                }
                Task::Value {
                    node,
                    place,
                    count,
                    segment,
                } => {
                    if let Some(segment) = segment {
                        self.path.push(segment);
                        self.stack.push(Task::Leave);
                    }
                    self.value(node, place, count)?;
                }
            }
        }
        Ok(())
    }

    fn value(&mut self, node: &'a SchemaNode, place: Place<'a>, count: usize) -> Result<(), Error> {
        let (record, offset) = match place {
            Place::Inline(record, offset) => (record, offset),
            Place::Linked(None) | Place::Linked(Some(Link::Null)) => {
                return self.null(node, count)
            }
            Place::Linked(Some(Link::Text(text))) => return self.linked_text(node, text),
            Place::Linked(Some(Link::Block(record))) => (record, 0),
        };
        let size = node.data_size();
        match node.kind() {
            Kind::Ignore => {}
            Kind::Int => {
                let v = read_signed(record, offset, size)?;
                self.emit(plain(v.to_string()))?;
            }
            Kind::Uint => {
                let v = read_unsigned(record, offset, size)?;
                self.emit(plain(v.to_string()))?;
            }
            Kind::Bool => {
                let v = match binder::read_value(record, offset, size, ScalarKind::Bool)? {
                    Value::Bool(v) => v,
                    other => return Err(invalid(format!("read {:?} for a boolean", other))),
                };
                self.emit(plain(v.to_string()))?;
            }
            Kind::Float => {
                let v = match binder::read_value(record, offset, size, ScalarKind::Float)? {
                    Value::Float(v) => v,
                    other => return Err(invalid(format!("read {:?} for a float", other))),
                };
                self.emit(plain(scalar::format_float(v, size)))?;
            }
            Kind::String { min, max } => {
                if node.is_pointer() {
                    return Err(invalid("string pointer holds a region".into()));
                }
                let text = binder::read_inline_str(record, offset, size)?;
                check_length(text, *min, *max)?;
                self.emit(Event::scalar(text))?;
            }
            Kind::Enum(values) => {
                let v = read_signed(record, offset, size)?;
                let event = match values.iter().find(|e| e.value == v) {
                    Some(e) => Event::scalar(e.name.as_str()),
                    None if node.is_strict() => {
                        return Err(invalid(format!("{} is not a named enum value", v)))
                    }
                    None => plain(v.to_string()),
                };
                self.emit(event)?;
            }
            Kind::Flags(values) => {
                let v = read_unsigned(record, offset, size)?;
                let mut rest = v;
                let style = style_of(node, self.config);
                self.emit(Event::SequenceStart {
                    anchor: None,
                    style,
                })?;
                for flag in values {
                    if flag.value != 0 && v & flag.value == flag.value {
                        rest &= !flag.value;
                        self.emit(Event::scalar(flag.name.as_str()))?;
                    }
                }
                if rest != 0 {
                    if node.is_strict() {
                        return Err(invalid(format!("bits {:#x} have no flag names", rest)));
                    }
                    self.emit(plain(rest.to_string()))?;
                }
                self.emit(Event::SequenceEnd)?;
            }
            Kind::Bitfield(bits) => {
                let v = read_unsigned(record, offset, size)?;
                let style = style_of(node, self.config);
                self.emit(Event::MappingStart {
                    anchor: None,
                    style,
                })?;
                for bit in bits {
                    self.emit(Event::scalar(bit.name.as_str()))?;
                    let field = (v >> bit.offset) & bit.max_value();
                    self.emit(plain(field.to_string()))?;
                }
                self.emit(Event::MappingEnd)?;
            }
            Kind::Mapping(fields) => {
                let style = style_of(node, self.config);
                self.stack.push(Task::Emit(Event::MappingEnd));
                for field in fields.iter().rev() {
                    let value = field.value();
                    if matches!(value.kind(), Kind::Ignore) {
                        continue;
                    }
                    let place = place_of(value, record, offset + field.data_offset());
                    if value.is_optional() && matches!(place, Place::Linked(None)) {
                        continue;
                    }
                    let count = match field.count() {
                        Some(count) => {
                            let n = read_unsigned(record, offset + count.offset, count.size)?;
                            usize::try_from(n).map_err(|_| {
                                Error::new(ErrorKind::BadParamSeqCount)
                                    .with_message(format!("count {} for `{}`", n, field.key()))
                            })?
                        }
                        None => 0,
                    };
                    self.stack.push(Task::Value {
                        node: value,
                        place,
                        count,
                        segment: Some(PathSegment::Key(field.key().into())),
                    });
                    self.stack.push(Task::Emit(Event::scalar(field.key())));
                }
                self.emit(Event::MappingStart {
                    anchor: None,
                    style,
                })?;
            }
            Kind::Sequence(seq) | Kind::SequenceFixed(seq) => {
                let count = if matches!(node.kind(), Kind::SequenceFixed(_)) {
                    seq.min()
                } else {
                    check_count(seq, count)?;
                    count
                };
                let stride = seq.stride();
                let end = count
                    .checked_mul(stride)
                    .and_then(|needed| needed.checked_add(offset));
                if end.map_or(true, |end| end > record.len()) {
                    return Err(Error::new(ErrorKind::BadParamSeqCount).with_message(format!(
                        "{} entries of {} bytes do not fit in {} bytes",
                        count,
                        stride,
                        record.len().saturating_sub(offset)
                    )));
                }
                let style = style_of(node, self.config);
                self.stack.push(Task::Emit(Event::SequenceEnd));
                let entry = seq.entry();
                for index in (0..count).rev() {
                    self.stack.push(Task::Value {
                        node: entry,
                        place: place_of(entry, record, offset + index * stride),
                        count: 0,
                        segment: Some(PathSegment::Index(index)),
                    });
                }
                self.emit(Event::SequenceStart {
                    anchor: None,
                    style,
                })?;
            }
        }
        Ok(())
    }

    fn null(&mut self, node: &SchemaNode, count: usize) -> Result<(), Error> {
        match node.kind() {
            Kind::Sequence(_) if count > 0 => Err(Error::new(ErrorKind::BadParamNullData)
                .with_message(format!("sequence of {} entries has no data", count))),
            _ if node.is_nullable() => self.emit(plain(scalar::null_text(node).into())),
            Kind::Sequence(seq) => {
                check_count(seq, 0)?;
                let style = style_of(node, self.config);
                self.emit(Event::SequenceStart {
                    anchor: None,
                    style,
                })?;
                self.emit(Event::SequenceEnd)
            }
            kind => Err(Error::new(ErrorKind::BadParamNullData)
                .with_message(format!("{} is null but not nullable", kind.name()))),
        }
    }

    fn linked_text(&mut self, node: &SchemaNode, text: &str) -> Result<(), Error> {
        match node.kind() {
            Kind::String { min, max } => {
                check_length(text, *min, *max)?;
                self.emit(Event::scalar(text))
            }
            kind => Err(invalid(format!("{} pointer holds a string", kind.name()))),
        }
    }
}

/// Save `target` as one document of events into `sink`
///
/// The target is only read.  If an error is returned, some events may
/// already have been delivered to the sink.
///
/// ```
/// use shaped_yaml::event::Event;
/// use shaped_yaml::{save, Config, FieldSchema, NodeFlags, Record, Schema, SchemaNode, Target};
///
/// let schema = Schema::new(
///     SchemaNode::mapping(4, vec![FieldSchema::new("port", 0, SchemaNode::uint(2))])
///         .with_flags(NodeFlags::POINTER),
/// )
/// .unwrap();
/// let mut record = Record::new(4);
/// record.set_u16(0, 8080).unwrap();
/// let mut events = Vec::new();
/// save(&schema, &Target::from_record(record), &mut events, &Config::default()).unwrap();
/// assert_eq!(events[2], Event::scalar("port"));
/// ```
pub fn save<K: EventSink>(
    schema: &Schema,
    target: &Target,
    sink: K,
    config: &Config,
) -> Result<(), Error> {
    let root = schema.root();
    if !root.is_pointer() {
        return Err(Error::new(ErrorKind::TopLevelNonPointer));
    }
    if !matches!(root.kind(), Kind::Sequence(_)) && target.seq_count() != 0 {
        return Err(Error::new(ErrorKind::BadParamSeqCount).with_message(format!(
            "count {} given for a {}",
            target.seq_count(),
            root.kind().name()
        )));
    }
    tracing::debug!(kind = root.kind().name(), "saving document");
    let mut saver = Saver {
        config,
        sink,
        path: YamlPath::root(),
        stack: Vec::new(),
    };
    match saver.run(root, target) {
        Ok(()) => {
            tracing::debug!("document saved");
            Ok(())
        }
        Err(err) => {
            tracing::debug!(error = %err, "document failed to save");
            if err.path().is_root() {
                Err(err.with_path(saver.path))
            } else {
                Err(err)
            }
        }
    }
}
