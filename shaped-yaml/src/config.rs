//! Per-call behaviour switches
//!

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::event::Style;

/// Behaviour of a single load or save call
///
/// A configuration is built by the caller and only ever read by the engine,
/// so one value may be shared between any number of concurrent calls.
///
/// ```
/// # use shaped_yaml::{Config, Style};
/// let config = Config {
///     ignore_unknown_keys: true,
///     default_style: Style::Flow,
///     ..Config::default()
/// };
/// assert!(!config.no_alias);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Skip mapping keys the schema does not know rather than failing
    pub ignore_unknown_keys: bool,
    /// Log a warning for each key skipped under `ignore_unknown_keys`
    pub warn_ignored_keys: bool,
    /// Collection style used when a node's flags do not pick one
    pub default_style: Style,
    /// Ask the emitter for explicit `---` and `...` document markers
    pub emit_document_delimiters: bool,
    /// Compare keys and symbolic names without regard to ASCII case,
    /// unless a node's flags say otherwise
    pub case_insensitive: bool,
    /// Treat any alias in the input as an error
    pub no_alias: bool,
}

impl Config {
    /// The default configuration
    pub fn new() -> Self {
        Self::default()
    }
}
