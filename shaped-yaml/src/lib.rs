//! Shaped YAML
//! ===========
//!
//! This library loads YAML documents directly into explicitly sized,
//! schema-shaped records, and saves such records back out as YAML.  The
//! schema says which YAML shapes are acceptable, how each value is
//! constrained, and at which byte offset of which record it is stored.
//!
//! ```
//! use shaped_yaml::{load_str, save_to_string, Config, FieldSchema, NodeFlags, Schema, SchemaNode};
//!
//! let schema = Schema::new(
//!     SchemaNode::mapping(
//!         16,
//!         vec![
//!             FieldSchema::new("name", 0, SchemaNode::string(1, 10)),
//!             FieldSchema::new("age", 8, SchemaNode::uint(4).with_flags(NodeFlags::OPTIONAL)),
//!         ],
//!     )
//!     .with_flags(NodeFlags::POINTER),
//! )
//! .unwrap();
//!
//! let config = Config::default();
//! let person = load_str(&schema, "name: Bob\nage: 42\n", &config).unwrap();
//! let record = person.data().unwrap();
//! assert_eq!(record.text(0), Some("Bob"));
//! assert_eq!(record.get_u32(8), Some(42));
//!
//! assert_eq!(save_to_string(&schema, &person, &config).unwrap(), "name: Bob\nage: 42\n");
//!
//! let err = load_str(&schema, "name: ''\n", &config).unwrap_err();
//! assert_eq!(err.to_string(), "1:7: /name: String length too short: length 0 is below minimum 1");
//! ```
//!
//! Loading and saving talk to YAML through the [`event`] vocabulary, so
//! any tokenizer or emitter can be plugged in by implementing
//! [`EventSource`](event::EventSource) or [`EventSink`](event::EventSink).
//! The [`yaml`] module provides both on top of `yaml-rust2`.
//!
//! Some behaviours are worth knowing up front:
//!
//! * The top level of every schema **MUST** be a pointer.
//! * Loading stops at the first fault; nothing loaded so far is returned.
//! * Aliases are expanded by replaying their anchor's events, unless
//!   [`Config::no_alias`] forbids them.
#![cfg_attr(
    feature = "serde",
    doc = r#"

With the `serde` feature, [`Config`] can itself be read from a
configuration file:

```
# use shaped_yaml::{Config, Style};
let config: Config = serde::Deserialize::deserialize(
    serde::de::value::MapDeserializer::<_, serde::de::value::Error>::new(
        [("no_alias", true)].into_iter(),
    ),
)
.unwrap();
assert!(config.no_alias);
assert_eq!(config.default_style, Style::Unset);
```
"#
)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod binder;
pub mod config;
pub mod error;
pub mod event;
pub mod loader;
pub mod record;
pub mod saver;
pub mod scalar;
pub mod schema;
pub mod yaml;

#[doc(inline)]
pub use config::Config;
#[doc(inline)]
pub use error::{strerror, Error, ErrorKind, PathSegment, YamlPath};
#[doc(inline)]
pub use event::{Marker, Style};
#[doc(inline)]
pub use loader::load;
#[doc(inline)]
pub use record::{Link, Record, Target};
#[doc(inline)]
pub use saver::save;
#[doc(inline)]
pub use schema::{
    BitDef, CountField, EnumValue, FieldSchema, FlagValue, Kind, NodeFlags, Schema, SchemaNode,
    SequenceSchema, POINTER_SIZE, UNLIMITED,
};

/// Load the first YAML document in `text` into a new target
///
/// Syntax errors are reported as [`ErrorKind::ParserError`] before any
/// value is loaded.
pub fn load_str(schema: &Schema, text: &str, config: &Config) -> Result<Target, Error> {
    let source = yaml::YamlSource::new(text)?;
    load(schema, source, config)
}

/// Save `target` as a YAML document
pub fn save_to_string(schema: &Schema, target: &Target, config: &Config) -> Result<String, Error> {
    let mut sink = yaml::YamlSink::new();
    save(schema, target, &mut sink, config)?;
    sink.finish()
}
