//! Adapters between events and YAML text, via `yaml-rust2`
//!
//! [`YamlSource`] parses text into the event vocabulary of [`crate::event`],
//! keeping the source position of every event so that load errors can say
//! where they happened.  [`YamlSink`] collects saved events into a
//! [`Yaml`] document and renders it with [`YamlEmitter`].
//!
//! Only the first document of a stream is loaded.  Tags are ignored.

use std::collections::VecDeque;

use hashlink::LinkedHashMap;
use yaml_rust::parser::{Event as YamlEvent, MarkedEventReceiver, Parser};
use yaml_rust::scanner::{Marker as YamlMarker, ScanError, TScalarStyle};
use yaml_rust::{Yaml, YamlEmitter};

use crate::error::{Error, ErrorKind};
use crate::event::{AnchorId, Event, EventSink, EventSource, Marker, ScalarStyle, Style};
use crate::scalar;

fn marker(mark: &YamlMarker) -> Marker {
    Marker::new(mark.index(), mark.line(), mark.col() + 1)
}

fn anchor(aid: usize) -> Option<AnchorId> {
    if aid == 0 {
        None
    } else {
        Some(AnchorId(aid))
    }
}

struct Collector<'a> {
    text: &'a str,
    events: VecDeque<(Event, Marker)>,
    documents: usize,
}

impl<'a> Collector<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            events: VecDeque::new(),
            documents: 0,
        }
    }

    /// The parser stands in `~` for omitted values; tell those apart from
    /// a `~` actually written in the source
    fn omitted(&self, value: &str, style: TScalarStyle, mark: &YamlMarker) -> bool {
        style == TScalarStyle::Plain
            && value == "~"
            && self.text.chars().nth(mark.index()) != Some('~')
    }
}

impl MarkedEventReceiver for Collector<'_> {
    fn on_event(&mut self, ev: YamlEvent, mark: YamlMarker) {
        let event = match ev {
            YamlEvent::Nothing | YamlEvent::StreamStart => return,
            YamlEvent::StreamEnd => {
                if self.documents == 0 {
                    self.events
                        .push_back((Event::DocumentEnd { explicit: false }, marker(&mark)));
                }
                return;
            }
            YamlEvent::DocumentStart => {
                self.documents += 1;
                Event::DocumentStart { explicit: false }
            }
            YamlEvent::DocumentEnd => Event::DocumentEnd { explicit: false },
            YamlEvent::Alias(aid) => Event::Alias(AnchorId(aid)),
            YamlEvent::Scalar(value, style, aid, _tag) => Event::Scalar {
                value: if self.omitted(&value, style, &mark) {
                    String::new()
                } else {
                    value
                },
                style: if style == TScalarStyle::Plain {
                    ScalarStyle::Plain
                } else {
                    ScalarStyle::Quoted
                },
                anchor: anchor(aid),
            },
            YamlEvent::SequenceStart(aid, _tag) => Event::SequenceStart {
                anchor: anchor(aid),
                style: Style::Unset,
            },
            YamlEvent::SequenceEnd => Event::SequenceEnd,
            YamlEvent::MappingStart(aid, _tag) => Event::MappingStart {
                anchor: anchor(aid),
                style: Style::Unset,
            },
            YamlEvent::MappingEnd => Event::MappingEnd,
        };
        self.events.push_back((event, marker(&mark)));
    }
}

fn scan_error(err: &ScanError) -> Error {
    Error::new(ErrorKind::ParserError)
        .with_message(err.info())
        .with_mark(Some(marker(err.marker())))
}

/// An [`EventSource`] over YAML text
///
/// The whole of the first document is tokenized up front, so syntax errors
/// are reported by [`YamlSource::new`] before any loading starts.
///
/// ```
/// use shaped_yaml::event::{Event, EventSource};
/// use shaped_yaml::yaml::YamlSource;
///
/// let mut source = YamlSource::new("hello").unwrap();
/// assert_eq!(source.next_event().unwrap(), Event::document_start());
/// assert!(matches!(source.next_event().unwrap(), Event::Scalar { value, .. } if value == "hello"));
/// assert_eq!(source.marker().unwrap().line(), 1);
/// ```
#[derive(Debug)]
pub struct YamlSource {
    events: VecDeque<(Event, Marker)>,
    last: Option<Marker>,
}

impl YamlSource {
    /// Tokenize `text`
    pub fn new(text: &str) -> Result<Self, Error> {
        let mut collector = Collector::new(text);
        let mut parser = Parser::new_from_str(text);
        parser
            .load(&mut collector, false)
            .map_err(|err| scan_error(&err))?;
        if collector.events.is_empty() {
            collector
                .events
                .push_back((Event::DocumentEnd { explicit: false }, Marker::new(0, 1, 1)));
        }
        Ok(Self {
            events: collector.events,
            last: None,
        })
    }
}

impl EventSource for YamlSource {
    fn next_event(&mut self) -> Result<Event, Error> {
        let (event, mark) = self.events.pop_front().ok_or_else(|| {
            Error::new(ErrorKind::ParserError)
                .with_message("document ended unexpectedly")
                .with_mark(self.last)
        })?;
        self.last = Some(mark);
        Ok(event)
    }

    fn marker(&self) -> Option<Marker> {
        self.last
    }
}

enum Building {
    Sequence(Vec<Yaml>),
    Mapping(LinkedHashMap<Yaml, Yaml>, Option<Yaml>),
}

/// An [`EventSink`] rendering YAML text
///
/// Block and flow hints are not honoured: `yaml-rust2` writes every
/// non-empty collection in block style.
///
/// ```
/// use shaped_yaml::event::{Event, EventSink};
/// use shaped_yaml::yaml::YamlSink;
///
/// let mut sink = YamlSink::new();
/// for event in [
///     Event::document_start(),
///     Event::mapping_start(),
///     Event::scalar("port"),
///     Event::scalar("8080"),
///     Event::MappingEnd,
///     Event::document_end(),
/// ] {
///     sink.emit(event).unwrap();
/// }
/// assert_eq!(sink.finish().unwrap(), "port: \"8080\"\n");
/// ```
#[derive(Default)]
pub struct YamlSink {
    stack: Vec<Building>,
    document: Option<Yaml>,
    started: bool,
    explicit_start: bool,
    explicit_end: Option<bool>,
}

fn unbalanced(what: &str) -> Error {
    Error::new(ErrorKind::EmitterError).with_message(format!("unbalanced {}", what))
}

/// The YAML value for a scalar, typed so the emitter leaves plain text bare
fn scalar_yaml(value: String, style: ScalarStyle) -> Yaml {
    if style != ScalarStyle::Plain {
        return Yaml::String(value);
    }
    if let Ok(v) = value.parse::<i64>() {
        Yaml::Integer(v)
    } else if value == "true" || value == "false" {
        Yaml::Boolean(value == "true")
    } else if value == "null" || value == "~" {
        Yaml::Null
    } else if !value.is_empty() && scalar::parse_float(&value).is_some() {
        Yaml::Real(value)
    } else {
        Yaml::String(value)
    }
}

impl YamlSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    fn push_value(&mut self, value: Yaml) -> Result<(), Error> {
        match self.stack.last_mut() {
            None => {
                if !self.started || self.document.is_some() {
                    return Err(unbalanced("document"));
                }
                self.document = Some(value);
            }
            Some(Building::Sequence(items)) => items.push(value),
            Some(Building::Mapping(map, key)) => match key.take() {
                None => *key = Some(value),
                Some(key) => {
                    map.insert(key, value);
                }
            },
        }
        Ok(())
    }

    /// Render the collected document as text
    ///
    /// The `---` and `...` markers are written only when the document's
    /// events asked for them.
    pub fn finish(self) -> Result<String, Error> {
        let document = match (self.document, self.explicit_end) {
            (Some(document), Some(_)) if self.stack.is_empty() => document,
            _ => {
                return Err(Error::new(ErrorKind::EmitterError)
                    .with_message("no complete document was written"))
            }
        };
        let mut out = String::new();
        YamlEmitter::new(&mut out)
            .dump(&document)
            .map_err(|e| Error::new(ErrorKind::EmitterError).with_message(format!("{:?}", e)))?;
        let mut text = if self.explicit_start {
            out
        } else {
            match out.strip_prefix("---") {
                Some(rest) => rest.trim_start_matches([' ', '\n']).to_string(),
                None => out,
            }
        };
        text.push('\n');
        if self.explicit_end == Some(true) {
            text.push_str("...\n");
        }
        Ok(text)
    }
}

impl EventSink for YamlSink {
    fn emit(&mut self, event: Event) -> Result<(), Error> {
        match event {
            Event::DocumentStart { explicit } => {
                if self.started {
                    return Err(Error::new(ErrorKind::EmitterError)
                        .with_message("only one document can be written"));
                }
                self.started = true;
                self.explicit_start = explicit;
            }
            Event::DocumentEnd { explicit } => {
                if !self.stack.is_empty() || self.document.is_none() {
                    return Err(unbalanced("document"));
                }
                self.explicit_end = Some(explicit);
            }
            Event::Scalar { value, style, .. } => self.push_value(scalar_yaml(value, style))?,
            Event::MappingStart { .. } => self
                .stack
                .push(Building::Mapping(LinkedHashMap::new(), None)),
            Event::SequenceStart { .. } => self.stack.push(Building::Sequence(Vec::new())),
            Event::MappingEnd => match self.stack.pop() {
                Some(Building::Mapping(map, None)) => self.push_value(Yaml::Hash(map))?,
                _ => return Err(unbalanced("mapping")),
            },
            Event::SequenceEnd => match self.stack.pop() {
                Some(Building::Sequence(items)) => self.push_value(Yaml::Array(items))?,
                _ => return Err(unbalanced("sequence")),
            },
            Event::Alias(_) => {
                return Err(Error::new(ErrorKind::EmitterError)
                    .with_message("aliases cannot be written"))
            }
        }
        Ok(())
    }
}
