//! Loading YAML events into records
//!
//! The loader walks the schema top-down while pulling events.  Rather than
//! recursing, it keeps an explicit stack of frames, one per open mapping,
//! sequence, flag list, bitfield, or skipped subtree, so document depth is
//! bounded only by memory.
//!
//! Every frame owns the record it is filling.  When a frame completes, its
//! record is either linked into (pointer values) or copied into (inline
//! values) the record of the frame below it.  If anything fails, the stack
//! is dropped and with it every allocation made so far.

use std::collections::{HashMap, VecDeque};

use crate::binder::{self, ScalarKind, Value};
use crate::config::Config;
use crate::error::{Error, ErrorKind, PathSegment, YamlPath};
use crate::event::{AnchorId, Event, EventSource};
use crate::record::{Link, Record, Target};
use crate::scalar::{self, CaseRule};
use crate::schema::{
    BitDef, CountField, FieldSchema, FlagValue, Kind, Schema, SchemaNode, SequenceSchema,
};

/// Anchored subtrees seen so far in the document, as the events making them up
type AliasTable = HashMap<AnchorId, Vec<Event>>;

struct Recording {
    anchor: AnchorId,
    events: Vec<Event>,
    depth: usize,
}

/// Pulls events from the source, expanding aliases into the events of the
/// node they refer to
struct EventReader<S> {
    source: S,
    anchors: Option<AliasTable>,
    recordings: Vec<Recording>,
    replay: VecDeque<Event>,
}

impl<S: EventSource> EventReader<S> {
    fn new(source: S, config: &Config) -> Self {
        Self {
            source,
            anchors: if config.no_alias {
                None
            } else {
                Some(AliasTable::new())
            },
            recordings: Vec::new(),
            replay: VecDeque::new(),
        }
    }

    fn next(&mut self) -> Result<Event, Error> {
        let event = match self.replay.pop_front() {
            Some(event) => event,
            None => match self.source.next_event()? {
                Event::Alias(id) => self.resolve(id)?,
                event => event,
            },
        };
        self.record(&event);
        Ok(event)
    }

    fn resolve(&mut self, id: AnchorId) -> Result<Event, Error> {
        let table = self.anchors.as_ref().ok_or_else(|| {
            Error::new(ErrorKind::Alias).with_message(format!("alias to anchor {}", id.0))
        })?;
        let events = table.get(&id).ok_or_else(|| {
            Error::new(ErrorKind::InvalidAlias)
                .with_message(format!("anchor {} is not defined here", id.0))
        })?;
        self.replay.extend(events.iter().cloned());
        self.replay
            .pop_front()
            .ok_or_else(|| Error::new(ErrorKind::InvalidAlias))
    }

    fn record(&mut self, event: &Event) {
        let Some(table) = self.anchors.as_mut() else {
            return;
        };
        let opens = matches!(
            event,
            Event::MappingStart { .. } | Event::SequenceStart { .. }
        );
        let closes = matches!(event, Event::MappingEnd | Event::SequenceEnd);
        for recording in &mut self.recordings {
            recording.events.push(event.clone().without_anchor());
            if opens {
                recording.depth += 1;
            } else if closes {
                recording.depth = recording.depth.saturating_sub(1);
            }
        }
        while self.recordings.last().map_or(false, |r| r.depth == 0) {
            if let Some(done) = self.recordings.pop() {
                table.insert(done.anchor, done.events);
            }
        }
        if let Some(anchor) = event.anchor() {
            let events = vec![event.clone().without_anchor()];
            if opens {
                self.recordings.push(Recording {
                    anchor,
                    events,
                    depth: 1,
                });
            } else {
                table.insert(anchor, events);
            }
        }
    }
}

/// Where a value is to be stored within the record of the frame holding it
#[derive(Copy, Clone)]
struct Slot<'s> {
    node: &'s SchemaNode,
    offset: usize,
    count: Option<&'s CountField>,
}

enum Pending {
    Field(usize),
    Unknown(String),
}

struct RootFrame {
    holder: Record,
    count: usize,
    done: bool,
}

struct MappingFrame<'s> {
    slot: Slot<'s>,
    fields: &'s [FieldSchema],
    record: Record,
    seen: Vec<bool>,
    pending: Option<Pending>,
    rule: CaseRule,
}

struct SequenceFrame<'s> {
    slot: Slot<'s>,
    seq: &'s SequenceSchema,
    fixed: bool,
    record: Record,
    count: usize,
    current: Option<usize>,
}

struct FlagsFrame<'s> {
    slot: Slot<'s>,
    values: &'s [FlagValue],
    value: u64,
    rule: CaseRule,
}

struct BitfieldFrame<'s> {
    slot: Slot<'s>,
    bits: &'s [BitDef],
    value: u64,
    pending: Option<usize>,
    seen: Vec<bool>,
    rule: CaseRule,
}

enum Frame<'s> {
    Root(RootFrame),
    Mapping(MappingFrame<'s>),
    Sequence(SequenceFrame<'s>),
    Flags(FlagsFrame<'s>),
    Bitfield(BitfieldFrame<'s>),
    Skip(usize),
}

impl Frame<'_> {
    fn record_mut(&mut self) -> &mut Record {
        match self {
            Frame::Root(root) => &mut root.holder,
            Frame::Mapping(mapping) => &mut mapping.record,
            Frame::Sequence(sequence) => &mut sequence.record,
            _ => unreachable!("frame holds no values"),
        }
    }

    fn value_done(&mut self) {
        match self {
            Frame::Root(root) => root.done = true,
            Frame::Mapping(mapping) => mapping.pending = None,
            Frame::Sequence(sequence) => sequence.current = None,
            _ => {}
        }
    }
}

enum Outcome<'s> {
    Continue,
    Descend(Frame<'s>),
    Complete,
    Finished(Target),
}

fn unexpected(expected: &str, found: &Event) -> Error {
    Error::new(ErrorKind::UnexpectedEvent)
        .with_message(format!("expected {}, found {}", expected, found.describe()))
}

fn invalid(message: String) -> Error {
    Error::new(ErrorKind::InvalidValue).with_message(message)
}

fn scalar_text(event: Event) -> Result<String, Error> {
    match event {
        Event::Scalar { value, .. } => Ok(value),
        other => Err(unexpected("scalar", &other)),
    }
}

fn skip_value<'s>(event: Event) -> Result<Option<Frame<'s>>, Error> {
    match event {
        Event::Scalar { .. } => Ok(None),
        Event::MappingStart { .. } | Event::SequenceStart { .. } => Ok(Some(Frame::Skip(1))),
        other => Err(unexpected("value", &other)),
    }
}

fn store_scalar(
    parent: &mut Record,
    slot: Slot<'_>,
    kind: ScalarKind,
    value: Value,
) -> Result<(), Error> {
    let size = slot.node.data_size();
    if slot.node.is_pointer() {
        let mut record = Record::try_new(size)?;
        binder::write_value(&mut record, 0, size, kind, value)?;
        parent.set_link(slot.offset, Link::Block(record));
        Ok(())
    } else {
        binder::write_value(parent, slot.offset, size, kind, value)
    }
}

fn store_record(parent: &mut Record, slot: Slot<'_>, record: Record) -> Result<(), Error> {
    if slot.node.is_pointer() {
        parent.set_link(slot.offset, Link::Block(record));
        Ok(())
    } else {
        parent.splice(slot.offset, record)
    }
}

struct Loader<'s, 'c, S> {
    root: &'s SchemaNode,
    config: &'c Config,
    reader: EventReader<S>,
    stack: Vec<Frame<'s>>,
}

impl<'s, 'c, S: EventSource> Loader<'s, 'c, S> {
    fn new(root: &'s SchemaNode, source: S, config: &'c Config) -> Self {
        Self {
            root,
            config,
            reader: EventReader::new(source, config),
            stack: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Target, Error> {
        match self.drive() {
            Ok(target) => Ok(target),
            Err(err) => Err(self.annotate(err)),
        }
    }

    fn annotate(&self, err: Error) -> Error {
        let err = if err.path().is_root() {
            err.with_path(self.path())
        } else {
            err
        };
        if err.mark().is_none() {
            let mark = self.reader.source.marker();
            err.with_mark(mark)
        } else {
            err
        }
    }

    fn path(&self) -> YamlPath {
        let mut path = YamlPath::root();
        for frame in &self.stack {
            match frame {
                Frame::Mapping(mapping) => match &mapping.pending {
                    Some(Pending::Field(index)) => {
                        path.push(PathSegment::Key(mapping.fields[*index].key().into()))
                    }
                    Some(Pending::Unknown(key)) => path.push(PathSegment::Key(key.clone())),
                    None => {}
                },
                Frame::Sequence(sequence) => {
                    if let Some(index) = sequence.current {
                        path.push(PathSegment::Index(index));
                    }
                }
                Frame::Bitfield(bitfield) => {
                    if let Some(index) = bitfield.pending {
                        path.push(PathSegment::Key(bitfield.bits[index].name.clone()));
                    }
                }
                _ => {}
            }
        }
        path
    }

    fn drive(&mut self) -> Result<Target, Error> {
        match self.reader.next()? {
            Event::DocumentStart { .. } => {}
            Event::DocumentEnd { .. } if self.root.is_nullable() => return Ok(Target::null()),
            other => return Err(unexpected("document start", &other)),
        }
        self.stack.push(Frame::Root(RootFrame {
            holder: Record::default(),
            count: 0,
            done: false,
        }));
        loop {
            let event = self.reader.next()?;
            tracing::trace!(?event, depth = self.stack.len(), "load event");
            let mut frame = self.stack.pop().expect("State stack became unbalanced");
            match self.handle(&mut frame, event) {
                Err(err) => {
                    self.stack.push(frame);
                    return Err(err);
                }
                Ok(Outcome::Continue) => self.stack.push(frame),
                Ok(Outcome::Descend(child)) => {
                    self.stack.push(frame);
                    self.stack.push(child);
                }
                Ok(Outcome::Complete) => self.complete(frame)?,
                Ok(Outcome::Finished(target)) => return Ok(target),
            }
        }
    }

    fn handle(&self, frame: &mut Frame<'s>, event: Event) -> Result<Outcome<'s>, Error> {
        match frame {
            Frame::Root(root) => {
                if root.done {
                    return match event {
                        Event::DocumentEnd { .. } => {
                            let mut target =
                                Target::new(root.holder.take_link(0).unwrap_or(Link::Null));
                            target.set_seq_count(root.count);
                            Ok(Outcome::Finished(target))
                        }
                        other => Err(unexpected("document end", &other)),
                    };
                }
                let slot = Slot {
                    node: self.root,
                    offset: 0,
                    count: None,
                };
                self.value_outcome(frame, slot, event)
            }
            Frame::Mapping(mapping) => match mapping.pending {
                None => self.mapping_key(mapping, event),
                Some(Pending::Field(index)) => {
                    let fields = mapping.fields;
                    let field = &fields[index];
                    let slot = Slot {
                        node: field.value(),
                        offset: field.data_offset(),
                        count: field.count(),
                    };
                    self.value_outcome(frame, slot, event)
                }
                Some(Pending::Unknown(_)) => match skip_value(event)? {
                    None => {
                        mapping.pending = None;
                        Ok(Outcome::Continue)
                    }
                    Some(child) => Ok(Outcome::Descend(child)),
                },
            },
            Frame::Sequence(sequence) => match event {
                Event::SequenceEnd => {
                    let (min, count) = (sequence.seq.min(), sequence.count);
                    if sequence.fixed && count != min {
                        Err(Error::new(ErrorKind::SequenceFixedCount)
                            .with_message(format!("expected {} entries, found {}", min, count)))
                    } else if count < min {
                        Err(Error::new(ErrorKind::SequenceEntriesMin)
                            .with_message(format!("expected at least {} entries, found {}", min, count)))
                    } else {
                        Ok(Outcome::Complete)
                    }
                }
                event => {
                    let max = sequence.seq.max();
                    if sequence.count >= max {
                        let kind = if sequence.fixed {
                            ErrorKind::SequenceFixedCount
                        } else {
                            ErrorKind::SequenceEntriesMax
                        };
                        return Err(Error::new(kind)
                            .with_message(format!("more than {} entries", max)));
                    }
                    let seq = sequence.seq;
                    let stride = seq.stride();
                    if !sequence.fixed {
                        sequence.record.grow(stride)?;
                    }
                    let index = sequence.count;
                    sequence.count += 1;
                    sequence.current = Some(index);
                    let slot = Slot {
                        node: seq.entry(),
                        offset: index * stride,
                        count: None,
                    };
                    self.value_outcome(frame, slot, event)
                }
            },
            Frame::Flags(flags) => match event {
                Event::Scalar { value, .. } => {
                    let bits = self.flag_value(flags, &value)?;
                    flags.value |= bits;
                    Ok(Outcome::Continue)
                }
                Event::SequenceEnd => {
                    if binder::fits_unsigned(flags.value, flags.slot.node.data_size()) {
                        Ok(Outcome::Complete)
                    } else {
                        Err(invalid(format!(
                            "flags {:#x} do not fit in {} bytes",
                            flags.value,
                            flags.slot.node.data_size()
                        )))
                    }
                }
                other => Err(unexpected("flag name", &other)),
            },
            Frame::Bitfield(bitfield) => match (bitfield.pending, event) {
                (None, Event::Scalar { value, .. }) => {
                    let rule = bitfield.rule;
                    let index = bitfield
                        .bits
                        .iter()
                        .position(|bit| rule.matches(&bit.name, &value))
                        .ok_or_else(|| invalid(format!("unknown bit field `{}`", value)))?;
                    if bitfield.seen[index] {
                        return Err(Error::new(ErrorKind::InvalidKey)
                            .with_message(format!("duplicate bit field `{}`", value)));
                    }
                    bitfield.seen[index] = true;
                    bitfield.pending = Some(index);
                    Ok(Outcome::Continue)
                }
                (None, Event::MappingEnd) => Ok(Outcome::Complete),
                (Some(index), Event::Scalar { value, .. }) => {
                    let bit = &bitfield.bits[index];
                    let v = scalar::parse_uint(&value)
                        .filter(|v| *v <= bit.max_value())
                        .ok_or_else(|| {
                            invalid(format!("`{}` does not fit in {} bits", value, bit.width))
                        })?;
                    let mask = bit.max_value() << bit.offset;
                    bitfield.value = (bitfield.value & !mask) | (v << bit.offset);
                    bitfield.pending = None;
                    Ok(Outcome::Continue)
                }
                (None, other) => Err(unexpected("bit field name", &other)),
                (Some(_), other) => Err(unexpected("bit field value", &other)),
            },
            Frame::Skip(depth) => match event {
                Event::MappingStart { .. } | Event::SequenceStart { .. } => {
                    *depth += 1;
                    Ok(Outcome::Continue)
                }
                Event::MappingEnd | Event::SequenceEnd => {
                    *depth -= 1;
                    if *depth == 0 {
                        Ok(Outcome::Complete)
                    } else {
                        Ok(Outcome::Continue)
                    }
                }
                Event::Scalar { .. } => Ok(Outcome::Continue),
                other => Err(unexpected("value", &other)),
            },
        }
    }

    fn mapping_key(
        &self,
        mapping: &mut MappingFrame<'s>,
        event: Event,
    ) -> Result<Outcome<'s>, Error> {
        match event {
            Event::Scalar { value: key, .. } => {
                let rule = mapping.rule;
                match mapping
                    .fields
                    .iter()
                    .position(|field| rule.matches(field.key(), &key))
                {
                    Some(index) => {
                        mapping.pending = Some(Pending::Field(index));
                        if mapping.seen[index] {
                            return Err(Error::new(ErrorKind::InvalidKey)
                                .with_message(format!("duplicate key `{}`", key)));
                        }
                        mapping.seen[index] = true;
                        Ok(Outcome::Continue)
                    }
                    None if self.config.ignore_unknown_keys => {
                        if self.config.warn_ignored_keys {
                            tracing::warn!(key = %key, "ignoring unknown key");
                        }
                        mapping.pending = Some(Pending::Unknown(key));
                        Ok(Outcome::Continue)
                    }
                    None => Err(Error::new(ErrorKind::InvalidKey)
                        .with_message(format!("unknown key `{}`", key))),
                }
            }
            Event::MappingEnd => {
                let missing = mapping
                    .fields
                    .iter()
                    .zip(&mapping.seen)
                    .find(|(field, seen)| {
                        !**seen
                            && !field.value().is_optional()
                            && !matches!(field.value().kind(), Kind::Ignore)
                    });
                match missing {
                    Some((field, _)) => Err(Error::new(ErrorKind::MappingFieldMissing)
                        .with_message(format!("missing field `{}`", field.key()))),
                    None => Ok(Outcome::Complete),
                }
            }
            other => Err(unexpected("mapping key", &other)),
        }
    }

    fn flag_value(&self, flags: &FlagsFrame<'s>, text: &str) -> Result<u64, Error> {
        let rule = flags.rule;
        if let Some(flag) = flags.values.iter().find(|f| rule.matches(&f.name, text)) {
            return Ok(flag.value);
        }
        if !flags.slot.node.is_strict() {
            if let Some(v) = scalar::parse_uint(text) {
                return Ok(v);
            }
        }
        Err(invalid(format!("`{}` is not a known flag", text)))
    }

    /// Start loading a value into `slot` of `frame`, turning the result into
    /// the outcome for `frame`
    fn value_outcome(
        &self,
        frame: &mut Frame<'s>,
        slot: Slot<'s>,
        event: Event,
    ) -> Result<Outcome<'s>, Error> {
        match self.begin_value(frame.record_mut(), slot, event)? {
            None => {
                frame.value_done();
                Ok(Outcome::Continue)
            }
            Some(child) => Ok(Outcome::Descend(child)),
        }
    }

    /// Load a scalar straight into `parent`, or return the frame which will
    /// load a collection
    fn begin_value(
        &self,
        parent: &mut Record,
        slot: Slot<'s>,
        event: Event,
    ) -> Result<Option<Frame<'s>>, Error> {
        let node = slot.node;
        if let Event::Scalar { value, .. } = &event {
            if scalar::is_null(node, value) {
                parent.set_link(slot.offset, Link::Null);
                return Ok(None);
            }
        }
        let size = node.data_size();
        match node.kind() {
            Kind::Ignore => return skip_value(event),
            Kind::Int => {
                let text = scalar_text(event)?;
                let v = scalar::parse_int(&text)
                    .filter(|v| binder::fits_signed(*v, size))
                    .ok_or_else(|| {
                        invalid(format!("`{}` is not a {}-byte signed integer", text, size))
                    })?;
                store_scalar(parent, slot, ScalarKind::Int, Value::Int(v))?;
            }
            Kind::Uint => {
                let text = scalar_text(event)?;
                let v = scalar::parse_uint(&text)
                    .filter(|v| binder::fits_unsigned(*v, size))
                    .ok_or_else(|| {
                        invalid(format!("`{}` is not a {}-byte unsigned integer", text, size))
                    })?;
                store_scalar(parent, slot, ScalarKind::Uint, Value::Uint(v))?;
            }
            Kind::Bool => {
                let text = scalar_text(event)?;
                let v = scalar::parse_bool(&text, scalar::bool_case_rule(node))
                    .ok_or_else(|| invalid(format!("`{}` is not a boolean", text)))?;
                store_scalar(parent, slot, ScalarKind::Bool, Value::Bool(v))?;
            }
            Kind::Float => {
                let text = scalar_text(event)?;
                let v = scalar::parse_float(&text)
                    .ok_or_else(|| invalid(format!("`{}` is not a number", text)))?;
                if size == 4 && v.is_finite() && (v as f32).is_infinite() {
                    return Err(invalid(format!("`{}` is out of range for a float", text)));
                }
                store_scalar(parent, slot, ScalarKind::Float, Value::Float(v))?;
            }
            Kind::String { min, max } => {
                let text = scalar_text(event)?;
                if text.len() < *min {
                    return Err(Error::new(ErrorKind::StringLengthMin).with_message(format!(
                        "length {} is below minimum {}",
                        text.len(),
                        min
                    )));
                }
                if text.len() > *max {
                    return Err(Error::new(ErrorKind::StringLengthMax).with_message(format!(
                        "length {} is above maximum {}",
                        text.len(),
                        max
                    )));
                }
                if node.is_pointer() {
                    parent.set_link(slot.offset, Link::Text(text));
                } else {
                    binder::write_inline_str(parent, slot.offset, size, &text)?;
                }
            }
            Kind::Enum(values) => {
                let text = scalar_text(event)?;
                let rule = CaseRule::for_node(node, self.config);
                let v = match values.iter().find(|e| rule.matches(&e.name, &text)) {
                    Some(e) => Some(e.value),
                    None if !node.is_strict() => scalar::parse_int(&text),
                    None => None,
                };
                let v = v
                    .filter(|v| binder::fits_signed(*v, size))
                    .ok_or_else(|| invalid(format!("`{}` is not a valid enum value", text)))?;
                store_scalar(parent, slot, ScalarKind::Int, Value::Int(v))?;
            }
            Kind::Flags(values) => {
                return match event {
                    Event::SequenceStart { .. } => Ok(Some(Frame::Flags(FlagsFrame {
                        slot,
                        values,
                        value: 0,
                        rule: CaseRule::for_node(node, self.config),
                    }))),
                    other => Err(unexpected("sequence start", &other)),
                };
            }
            Kind::Bitfield(bits) => {
                return match event {
                    Event::MappingStart { .. } => Ok(Some(Frame::Bitfield(BitfieldFrame {
                        slot,
                        bits,
                        value: 0,
                        pending: None,
                        seen: vec![false; bits.len()],
                        rule: CaseRule::for_node(node, self.config),
                    }))),
                    other => Err(unexpected("mapping start", &other)),
                };
            }
            Kind::Mapping(fields) => {
                return match event {
                    Event::MappingStart { .. } => Ok(Some(Frame::Mapping(MappingFrame {
                        slot,
                        fields,
                        record: Record::try_new(size)?,
                        seen: vec![false; fields.len()],
                        pending: None,
                        rule: CaseRule::for_node(node, self.config),
                    }))),
                    other => Err(unexpected("mapping start", &other)),
                };
            }
            Kind::Sequence(seq) | Kind::SequenceFixed(seq) => {
                let fixed = matches!(node.kind(), Kind::SequenceFixed(_));
                return match event {
                    Event::SequenceStart { .. } => Ok(Some(Frame::Sequence(SequenceFrame {
                        slot,
                        seq,
                        fixed,
                        record: if fixed {
                            Record::try_new(size)?
                        } else {
                            Record::default()
                        },
                        count: 0,
                        current: None,
                    }))),
                    other => Err(unexpected("sequence start", &other)),
                };
            }
        }
        Ok(None)
    }

    /// Store a finished frame's value into the frame below it
    fn complete(&mut self, frame: Frame<'s>) -> Result<(), Error> {
        let parent = self
            .stack
            .last_mut()
            .expect("State stack became unbalanced");
        match frame {
            Frame::Mapping(mapping) => store_record(parent.record_mut(), mapping.slot, mapping.record)?,
            Frame::Sequence(sequence) => {
                let (slot, count, fixed) = (sequence.slot, sequence.count, sequence.fixed);
                store_record(parent.record_mut(), slot, sequence.record)?;
                match (parent, slot.count) {
                    (Frame::Root(root), _) => root.count = count,
                    (parent, Some(field)) if !fixed => {
                        let count = count as u64;
                        if !binder::fits_unsigned(count, field.size) {
                            return Err(Error::new(ErrorKind::SequenceEntriesMax).with_message(
                                format!("{} entries overflow a {}-byte count", count, field.size),
                            ));
                        }
                        binder::write_value(
                            parent.record_mut(),
                            field.offset,
                            field.size,
                            ScalarKind::Uint,
                            Value::Uint(count),
                        )?;
                    }
                    _ => {}
                }
            }
            Frame::Flags(flags) => store_scalar(
                parent.record_mut(),
                flags.slot,
                ScalarKind::Uint,
                Value::Uint(flags.value),
            )?,
            Frame::Bitfield(bitfield) => store_scalar(
                parent.record_mut(),
                bitfield.slot,
                ScalarKind::Uint,
                Value::Uint(bitfield.value),
            )?,
            Frame::Skip(_) => {}
            Frame::Root(_) => unreachable!("root frame never completes"),
        }
        if let Some(parent) = self.stack.last_mut() {
            parent.value_done();
        }
        Ok(())
    }
}

/// Load one document from `source` into a new target shaped by `schema`
///
/// On success the caller owns everything in the returned [`Target`].  On
/// failure nothing is returned and every allocation made during the call
/// has been released.
///
/// ```
/// use shaped_yaml::event::{Event, EventBuffer};
/// use shaped_yaml::{load, Config, FieldSchema, NodeFlags, Schema, SchemaNode};
///
/// let schema = Schema::new(
///     SchemaNode::mapping(4, vec![FieldSchema::new("port", 0, SchemaNode::uint(2))])
///         .with_flags(NodeFlags::POINTER),
/// )
/// .unwrap();
/// let events: EventBuffer = vec![
///     Event::document_start(),
///     Event::mapping_start(),
///     Event::scalar("port"),
///     Event::scalar("8080"),
///     Event::MappingEnd,
///     Event::document_end(),
/// ]
/// .into();
/// let target = load(&schema, events, &Config::default()).unwrap();
/// assert_eq!(target.data().unwrap().get_u16(0), Some(8080));
/// ```
pub fn load<S: EventSource>(schema: &Schema, source: S, config: &Config) -> Result<Target, Error> {
    let root = schema.root();
    if !root.is_pointer() {
        return Err(Error::new(ErrorKind::TopLevelNonPointer));
    }
    tracing::debug!(kind = root.kind().name(), "loading document");
    let result = Loader::new(root, source, config).run();
    match &result {
        Ok(_) => tracing::debug!("document loaded"),
        Err(err) => tracing::debug!(error = %err, "document failed to load"),
    }
    result
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::event::EventBuffer;
    use crate::schema::{NodeFlags, UNLIMITED};

    fn doc(body: Vec<Event>) -> EventBuffer {
        let mut events = vec![Event::document_start()];
        events.extend(body);
        events.push(Event::document_end());
        events.into()
    }

    fn map(pairs: Vec<(&str, Vec<Event>)>) -> Vec<Event> {
        let mut events = vec![Event::mapping_start()];
        for (key, value) in pairs {
            events.push(Event::scalar(key));
            events.extend(value);
        }
        events.push(Event::MappingEnd);
        events
    }

    fn seq(entries: Vec<Event>) -> Vec<Event> {
        let mut events = vec![Event::sequence_start()];
        events.extend(entries);
        events.push(Event::SequenceEnd);
        events
    }

    fn s(text: &str) -> Vec<Event> {
        vec![Event::scalar(text)]
    }

    fn person() -> Schema {
        Schema::new(
            SchemaNode::mapping(
                16,
                vec![
                    FieldSchema::new("name", 0, SchemaNode::string(1, 10)),
                    FieldSchema::new(
                        "age",
                        8,
                        SchemaNode::uint(4).with_flags(NodeFlags::OPTIONAL),
                    ),
                ],
            )
            .with_flags(NodeFlags::POINTER),
        )
        .unwrap()
    }

    fn load_events(schema: &Schema, events: EventBuffer, config: &Config) -> Result<Target, Error> {
        load(schema, events, config)
    }

    fn fails(schema: &Schema, body: Vec<Event>) -> ErrorKind {
        load_events(schema, doc(body), &Config::default())
            .unwrap_err()
            .kind()
    }

    #[test]
    fn person_example() {
        let target = load_events(
            &person(),
            doc(map(vec![("name", s("Bob"))])),
            &Config::default(),
        )
        .unwrap();
        let record = target.data().unwrap();
        assert_eq!(record.text(0), Some("Bob"));
        assert_eq!(record.get_u32(8), Some(0));

        assert_eq!(
            fails(&person(), map(vec![("name", s(""))])),
            ErrorKind::StringLengthMin
        );
        assert_eq!(
            fails(&person(), map(vec![("name", s("Bob")), ("extra", s("x"))])),
            ErrorKind::InvalidKey
        );
        let config = Config {
            ignore_unknown_keys: true,
            warn_ignored_keys: true,
            ..Config::default()
        };
        let target = load_events(
            &person(),
            doc(map(vec![
                ("extra", map(vec![("deep", seq(s("x")))])),
                ("name", s("Bob")),
                ("age", s("42")),
            ])),
            &config,
        )
        .unwrap();
        assert_eq!(target.data().unwrap().get_u32(8), Some(42));
    }

    #[test]
    fn missing_and_duplicate_fields() {
        assert_eq!(
            fails(&person(), map(vec![("age", s("1"))])),
            ErrorKind::MappingFieldMissing
        );
        assert_eq!(
            fails(&person(), map(vec![("name", s("a")), ("name", s("b"))])),
            ErrorKind::InvalidKey
        );
    }

    #[test]
    fn string_length_boundaries() {
        let schema = Schema::new(SchemaNode::string(2, 4)).unwrap();
        for (text, outcome) in [
            ("a", Err(ErrorKind::StringLengthMin)),
            ("ab", Ok(())),
            ("abcd", Ok(())),
            ("abcde", Err(ErrorKind::StringLengthMax)),
        ] {
            let result = load_events(&schema, doc(s(text)), &Config::default());
            assert_eq!(result.as_ref().map(|_| ()).map_err(Error::kind), outcome);
            if let Ok(target) = result {
                assert_eq!(target.text(), Some(text));
            }
        }
    }

    #[test]
    fn sequence_bounds() {
        let schema = Schema::new(SchemaNode::sequence(SchemaNode::int(2), 2, 3)).unwrap();
        assert_eq!(fails(&schema, seq(s("1"))), ErrorKind::SequenceEntriesMin);
        assert_eq!(
            fails(&schema, seq([s("1"), s("2"), s("3"), s("4")].concat())),
            ErrorKind::SequenceEntriesMax
        );
        let target = load_events(
            &schema,
            doc(seq([s("-1"), s("0x7fff")].concat())),
            &Config::default(),
        )
        .unwrap();
        assert_eq!(target.seq_count(), 2);
        let data = target.data().unwrap();
        assert_eq!(data.len(), 4);
        assert_eq!(data.get_i16(0), Some(-1));
        assert_eq!(data.get_i16(2), Some(i16::MAX));
    }

    #[test]
    fn fixed_sequence_count() {
        let schema = Schema::new(
            SchemaNode::sequence_fixed(SchemaNode::uint(1), 2).with_flags(NodeFlags::POINTER),
        )
        .unwrap();
        assert_eq!(fails(&schema, seq(s("1"))), ErrorKind::SequenceFixedCount);
        assert_eq!(
            fails(&schema, seq([s("1"), s("2"), s("3")].concat())),
            ErrorKind::SequenceFixedCount
        );
        let target =
            load_events(&schema, doc(seq([s("1"), s("2")].concat())), &Config::default())
                .unwrap();
        assert_eq!(target.data().unwrap().as_bytes(), &[1, 2]);
    }

    #[test]
    fn sequence_field_writes_count() {
        let schema = Schema::new(
            SchemaNode::mapping(
                16,
                vec![FieldSchema::sequence(
                    "ports",
                    0,
                    8,
                    2,
                    SchemaNode::uint(2),
                    0,
                    UNLIMITED,
                )],
            )
            .with_flags(NodeFlags::POINTER),
        )
        .unwrap();
        let target = load_events(
            &schema,
            doc(map(vec![("ports", seq([s("80"), s("443"), s("8080")].concat()))])),
            &Config::default(),
        )
        .unwrap();
        let record = target.data().unwrap();
        assert_eq!(record.get_u16(8), Some(3));
        let ports = record.block(0).unwrap();
        assert_eq!(ports.get_u16(2), Some(443));
    }

    #[test]
    fn enum_strictness() {
        let colours = || SchemaNode::enumeration(4, [("red", 0), ("green", 1)]);
        let lax = Schema::new(colours().with_flags(NodeFlags::POINTER)).unwrap();
        let strict =
            Schema::new(colours().with_flags(NodeFlags::POINTER | NodeFlags::STRICT)).unwrap();
        let target = load_events(&lax, doc(s("7")), &Config::default()).unwrap();
        assert_eq!(target.data().unwrap().get_i32(0), Some(7));
        assert_eq!(fails(&strict, s("7")), ErrorKind::InvalidValue);
        let target = load_events(&strict, doc(s("green")), &Config::default()).unwrap();
        assert_eq!(target.data().unwrap().get_i32(0), Some(1));
        assert_eq!(fails(&strict, s("Green")), ErrorKind::InvalidValue);
        let config = Config {
            case_insensitive: true,
            ..Config::default()
        };
        let target = load_events(&strict, doc(s("Green")), &config).unwrap();
        assert_eq!(target.data().unwrap().get_i32(0), Some(1));
    }

    #[test]
    fn flags_and_bitfields() {
        let schema = Schema::new(
            SchemaNode::mapping(
                8,
                vec![
                    FieldSchema::new(
                        "perms",
                        0,
                        SchemaNode::flags(2, [("read", 1), ("write", 2), ("exec", 4)]),
                    ),
                    FieldSchema::new(
                        "bits",
                        4,
                        SchemaNode::bitfield(4, [("low", 0, 4), ("high", 4, 4)]),
                    ),
                ],
            )
            .with_flags(NodeFlags::POINTER),
        )
        .unwrap();
        let target = load_events(
            &schema,
            doc(map(vec![
                ("perms", seq([s("read"), s("exec"), s("16")].concat())),
                ("bits", map(vec![("high", s("0xa"))])),
            ])),
            &Config::default(),
        )
        .unwrap();
        let record = target.data().unwrap();
        assert_eq!(record.get_u16(0), Some(21));
        assert_eq!(record.get_u32(4), Some(0xa0));

        let err = load_events(
            &schema,
            doc(map(vec![
                ("perms", seq(vec![])),
                ("bits", map(vec![("low", s("16"))])),
            ])),
            &Config::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
        assert_eq!(err.path().to_string(), "/bits/low");

        let err = load_events(
            &schema,
            doc(map(vec![
                ("perms", seq(vec![])),
                ("bits", map(vec![("low", s("1")), ("low", s("2"))])),
            ])),
            &Config::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidKey);
        assert_eq!(err.path().to_string(), "/bits");
    }

    #[test]
    fn strict_flags_need_names() {
        let schema = Schema::new(
            SchemaNode::flags(2, [("read", 1), ("write", 2)])
                .with_flags(NodeFlags::POINTER | NodeFlags::STRICT),
        )
        .unwrap();
        let target = load_events(&schema, doc(seq(s("read"))), &Config::default()).unwrap();
        assert_eq!(target.data().unwrap().get_u16(0), Some(1));
        let err = load_events(
            &schema,
            doc(seq([s("read"), s("4")].concat())),
            &Config::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
    }

    #[test]
    fn inline_strings_refuse_nul() {
        let schema = Schema::new(
            SchemaNode::mapping(
                8,
                vec![FieldSchema::new("tag", 0, SchemaNode::inline_string(8, 0, 7))],
            )
            .with_flags(NodeFlags::POINTER),
        )
        .unwrap();
        assert_eq!(
            fails(&schema, map(vec![("tag", s("a\0b"))])),
            ErrorKind::InvalidValue
        );
    }

    #[test]
    fn nulls() {
        let schema = Schema::new(
            SchemaNode::mapping(
                16,
                vec![
                    FieldSchema::new(
                        "a",
                        0,
                        SchemaNode::int(4).with_flags(NodeFlags::NULLABLE),
                    ),
                    FieldSchema::new(
                        "b",
                        8,
                        SchemaNode::string(1, 8).with_flags(NodeFlags::NULLABLE_STRING),
                    ),
                ],
            )
            .with_flags(NodeFlags::POINTER),
        )
        .unwrap();
        let target = load_events(
            &schema,
            doc(map(vec![("a", s("")), ("b", s("~"))])),
            &Config::default(),
        )
        .unwrap();
        let record = target.data().unwrap();
        assert!(record.is_null(0));
        assert!(record.is_null(8));
        let target = load_events(
            &schema,
            doc(map(vec![("a", s("-5")), ("b", s("x"))])),
            &Config::default(),
        )
        .unwrap();
        let record = target.data().unwrap();
        assert_eq!(record.block(0).unwrap().get_i32(0), Some(-5));
        assert_eq!(record.text(8), Some("x"));
    }

    #[test]
    fn empty_stream() {
        let nullable = Schema::new(SchemaNode::int(4).with_flags(NodeFlags::NULLABLE)).unwrap();
        let target = load_events(
            &nullable,
            vec![Event::document_end()].into(),
            &Config::default(),
        )
        .unwrap();
        assert!(target.is_null());
        let err = load_events(&person(), vec![Event::document_end()].into(), &Config::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEvent);
    }

    #[test]
    fn aliases() {
        let schema = Schema::new(
            SchemaNode::mapping(
                32,
                vec![
                    FieldSchema::new("first", 0, person().root().clone()),
                    FieldSchema::new("second", 8, person().root().clone()),
                ],
            )
            .with_flags(NodeFlags::POINTER),
        )
        .unwrap();
        let mut anchored = map(vec![("name", s("Ann")), ("age", s("30"))]);
        anchored[0] = Event::mapping_start().anchored(1);
        let body = || {
            let mut events = vec![Event::mapping_start(), Event::scalar("first")];
            events.extend(anchored.clone());
            events.push(Event::scalar("second"));
            events.push(Event::Alias(AnchorId(1)));
            events.push(Event::MappingEnd);
            events
        };
        let target = load_events(&schema, doc(body()), &Config::default()).unwrap();
        let record = target.data().unwrap();
        assert_eq!(record.block(0), record.block(8));
        assert_eq!(record.block(8).unwrap().text(0), Some("Ann"));

        let config = Config {
            no_alias: true,
            ..Config::default()
        };
        let err = load_events(&schema, doc(body()), &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Alias);
        assert_eq!(err.path().to_string(), "/second");

        let err = load_events(
            &schema,
            doc(map(vec![("first", vec![Event::Alias(AnchorId(9))])])),
            &Config::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAlias);
    }

    #[test]
    fn scalar_anchor_alias() {
        let schema = Schema::new(SchemaNode::sequence(SchemaNode::uint(1), 0, 4)).unwrap();
        let body = seq(vec![
            Event::scalar("9").anchored(2),
            Event::Alias(AnchorId(2)),
        ]);
        let target = load_events(&schema, doc(body), &Config::default()).unwrap();
        assert_eq!(target.data().unwrap().as_bytes(), &[9, 9]);
    }

    #[test]
    fn unexpected_shapes() {
        assert_eq!(
            fails(&person(), s("scalar")),
            ErrorKind::UnexpectedEvent
        );
        assert_eq!(
            fails(&person(), map(vec![("name", map(vec![]))])),
            ErrorKind::UnexpectedEvent
        );
        let err = load_events(
            &person(),
            vec![Event::mapping_start()].into(),
            &Config::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEvent);
    }

    #[test]
    fn integer_ranges() {
        let schema = Schema::new(SchemaNode::int(1).with_flags(NodeFlags::POINTER)).unwrap();
        assert_eq!(fails(&schema, s("128")), ErrorKind::InvalidValue);
        assert_eq!(fails(&schema, s("1.5")), ErrorKind::InvalidValue);
        let schema = Schema::new(SchemaNode::uint(1).with_flags(NodeFlags::POINTER)).unwrap();
        assert_eq!(fails(&schema, s("-1")), ErrorKind::InvalidValue);
        let schema = Schema::new(SchemaNode::float(4).with_flags(NodeFlags::POINTER)).unwrap();
        assert_eq!(fails(&schema, s("1e39")), ErrorKind::InvalidValue);
    }

    #[test]
    fn top_level_must_be_pointer() {
        let schema = Schema::new(SchemaNode::int(4)).unwrap();
        let err = load_events(&schema, doc(s("1")), &Config::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TopLevelNonPointer);
    }

    #[test]
    fn deep_ignored_values() {
        let schema = Schema::new(
            SchemaNode::mapping(
                0,
                vec![FieldSchema::new(
                    "junk",
                    0,
                    SchemaNode::ignore().with_flags(NodeFlags::OPTIONAL),
                )],
            )
            .with_flags(NodeFlags::POINTER),
        )
        .unwrap();
        let depth = 100_000;
        let mut body = vec![Event::mapping_start(), Event::scalar("junk")];
        body.extend(std::iter::repeat(Event::sequence_start()).take(depth));
        body.extend(std::iter::repeat(Event::SequenceEnd).take(depth));
        body.push(Event::MappingEnd);
        assert!(load_events(&schema, doc(body), &Config::default()).is_ok());
    }

    #[test]
    fn error_paths() {
        let schema = Schema::new(
            SchemaNode::mapping(
                16,
                vec![FieldSchema::sequence(
                    "people",
                    0,
                    8,
                    4,
                    person().root().clone(),
                    0,
                    UNLIMITED,
                )],
            )
            .with_flags(NodeFlags::POINTER),
        )
        .unwrap();
        let err = load_events(
            &schema,
            doc(map(vec![(
                "people",
                seq([
                    map(vec![("name", s("ok"))]),
                    map(vec![("name", s("ok")), ("age", s("old"))]),
                ]
                .concat()),
            )])),
            &Config::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
        assert_eq!(err.path().to_string(), "/people/1/age");
    }
}
