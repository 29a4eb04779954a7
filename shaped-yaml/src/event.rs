//! The event vocabulary exchanged with YAML tokenizers and emitters
//!
//! Loading pulls [`Event`]s from an [`EventSource`], saving pushes them into
//! an [`EventSink`].  The concrete YAML text is entirely the business of
//! whatever sits at the other end; see [`crate::yaml`] for adapters to
//! `yaml-rust2`.

use std::collections::VecDeque;
use std::fmt::{self, Display};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorKind};

/// A position in the source text an event was parsed from
///
/// ```
/// # use shaped_yaml::Marker;
/// let marker = Marker::new(12, 2, 5);
/// assert_eq!(marker.line(), 2);
/// assert_eq!(format!("{}", marker), "2:5");
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Marker {
    character: usize,
    line: usize,
    column: usize,
}

impl Marker {
    /// Create a new Marker
    ///
    /// Lines and columns are 1-indexed, the character index is 0-indexed.
    pub fn new(character: usize, line: usize, column: usize) -> Self {
        Self {
            character,
            line,
            column,
        }
    }

    /// The character index at which this marker resides
    pub fn character(&self) -> usize {
        self.character
    }

    /// The line number on which this marker resides, 1-indexed
    pub fn line(&self) -> usize {
        self.line
    }

    /// The column number at which this marker resides, 1-indexed
    pub fn column(&self) -> usize {
        self.column
    }
}

impl Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Identifies an anchored node so that aliases may refer back to it
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct AnchorId(pub usize);

/// Layout hint for collections
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Style {
    /// Let the emitter decide
    #[default]
    Unset,
    /// Indented, one entry per line
    Block,
    /// Inline `[a, b]` / `{a: b}`
    Flow,
}

/// How a scalar was, or should be, written
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ScalarStyle {
    /// Let the emitter decide, quoting if the text needs it
    #[default]
    Any,
    /// Unquoted; the text is a number, boolean or symbolic name
    Plain,
    /// The scalar was quoted or a block scalar in the source
    Quoted,
}

/// A single parse or emit event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// A document begins; `explicit` requests a `---` marker
    DocumentStart {
        /// Whether the document start marker is written out
        explicit: bool,
    },
    /// A document ends; `explicit` requests a `...` marker
    DocumentEnd {
        /// Whether the document end marker is written out
        explicit: bool,
    },
    /// A scalar value
    Scalar {
        /// The scalar's text
        value: String,
        /// How the scalar is quoted
        style: ScalarStyle,
        /// Anchor defined on this scalar, if any
        anchor: Option<AnchorId>,
    },
    /// A mapping begins; keys and values alternate until [`Event::MappingEnd`]
    MappingStart {
        /// Anchor defined on this mapping, if any
        anchor: Option<AnchorId>,
        /// Layout hint
        style: Style,
    },
    /// The innermost open mapping ends
    MappingEnd,
    /// A sequence begins; entries follow until [`Event::SequenceEnd`]
    SequenceStart {
        /// Anchor defined on this sequence, if any
        anchor: Option<AnchorId>,
        /// Layout hint
        style: Style,
    },
    /// The innermost open sequence ends
    SequenceEnd,
    /// A reference to a previously anchored node
    Alias(AnchorId),
}

impl Event {
    /// A plain scalar with no anchor
    ///
    /// ```
    /// # use shaped_yaml::event::Event;
    /// assert!(matches!(Event::scalar("7"), Event::Scalar { .. }));
    /// ```
    pub fn scalar<S: Into<String>>(value: S) -> Self {
        Event::Scalar {
            value: value.into(),
            style: ScalarStyle::Any,
            anchor: None,
        }
    }

    /// An unanchored mapping start with no style preference
    pub fn mapping_start() -> Self {
        Event::MappingStart {
            anchor: None,
            style: Style::Unset,
        }
    }

    /// An unanchored sequence start with no style preference
    pub fn sequence_start() -> Self {
        Event::SequenceStart {
            anchor: None,
            style: Style::Unset,
        }
    }

    /// A document start with no explicit marker
    pub fn document_start() -> Self {
        Event::DocumentStart { explicit: false }
    }

    /// A document end with no explicit marker
    pub fn document_end() -> Self {
        Event::DocumentEnd { explicit: false }
    }

    /// Attach an anchor to a scalar, mapping, or sequence start
    ///
    /// Other events cannot carry anchors and are returned unchanged.
    pub fn anchored(mut self, id: usize) -> Self {
        match &mut self {
            Event::Scalar { anchor, .. }
            | Event::MappingStart { anchor, .. }
            | Event::SequenceStart { anchor, .. } => *anchor = Some(AnchorId(id)),
            _ => {}
        }
        self
    }

    /// The anchor this event defines, if any
    pub fn anchor(&self) -> Option<AnchorId> {
        match self {
            Event::Scalar { anchor, .. }
            | Event::MappingStart { anchor, .. }
            | Event::SequenceStart { anchor, .. } => *anchor,
            _ => None,
        }
    }

    /// This event with any anchor definition removed
    pub fn without_anchor(mut self) -> Self {
        match &mut self {
            Event::Scalar { anchor, .. }
            | Event::MappingStart { anchor, .. }
            | Event::SequenceStart { anchor, .. } => *anchor = None,
            _ => {}
        }
        self
    }

    /// A short name for this event, for diagnostics
    pub fn describe(&self) -> &'static str {
        match self {
            Event::DocumentStart { .. } => "document start",
            Event::DocumentEnd { .. } => "document end",
            Event::Scalar { .. } => "scalar",
            Event::MappingStart { .. } => "mapping start",
            Event::MappingEnd => "mapping end",
            Event::SequenceStart { .. } => "sequence start",
            Event::SequenceEnd => "sequence end",
            Event::Alias(_) => "alias",
        }
    }
}

/// A pull-style producer of parse events
pub trait EventSource {
    /// Produce the next event
    ///
    /// Sources report their own faults as [`ErrorKind::ParserError`].
    fn next_event(&mut self) -> Result<Event, Error>;

    /// The source position of the event most recently returned, if known
    fn marker(&self) -> Option<Marker> {
        None
    }
}

impl<T: EventSource + ?Sized> EventSource for &mut T {
    fn next_event(&mut self) -> Result<Event, Error> {
        (**self).next_event()
    }

    fn marker(&self) -> Option<Marker> {
        (**self).marker()
    }
}

/// A push-style consumer of emit events
pub trait EventSink {
    /// Accept the next event
    ///
    /// Sinks report their own faults as [`ErrorKind::EmitterError`].
    fn emit(&mut self, event: Event) -> Result<(), Error>;
}

impl<T: EventSink + ?Sized> EventSink for &mut T {
    fn emit(&mut self, event: Event) -> Result<(), Error> {
        (**self).emit(event)
    }
}

impl EventSink for Vec<Event> {
    fn emit(&mut self, event: Event) -> Result<(), Error> {
        self.push(event);
        Ok(())
    }
}

/// An in-memory list of events usable as a source
///
/// This is handy for tests and for feeding events captured from a save
/// straight back into a load.
///
/// ```
/// # use shaped_yaml::event::{Event, EventBuffer, EventSource};
/// let mut buffer: EventBuffer = vec![Event::document_start()].into();
/// assert_eq!(buffer.next_event().unwrap(), Event::document_start());
/// assert!(buffer.next_event().is_err());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventBuffer {
    events: VecDeque<Event>,
}

impl EventBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event to the end of the buffer
    pub fn push(&mut self, event: Event) {
        self.events.push_back(event);
    }

    /// Number of events not yet consumed
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether every event has been consumed
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl From<Vec<Event>> for EventBuffer {
    fn from(value: Vec<Event>) -> Self {
        Self {
            events: value.into(),
        }
    }
}

impl EventSource for EventBuffer {
    fn next_event(&mut self) -> Result<Event, Error> {
        self.events.pop_front().ok_or_else(|| {
            Error::new(ErrorKind::ParserError).with_message("event stream ended unexpectedly")
        })
    }
}

impl EventSink for EventBuffer {
    fn emit(&mut self, event: Event) -> Result<(), Error> {
        self.push(event);
        Ok(())
    }
}
