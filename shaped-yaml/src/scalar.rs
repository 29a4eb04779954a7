//! The textual grammar of scalars
//!

use crate::config::Config;
use crate::schema::{NodeFlags, SchemaNode};

/// How names and keys are compared
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CaseRule {
    /// Byte for byte
    Sensitive,
    /// Ignoring ASCII case
    Insensitive,
}

impl CaseRule {
    /// Resolve the rule for a node
    ///
    /// A node's `CASE_INSENSITIVE` wins over its `CASE_SENSITIVE`; with
    /// neither, the configuration decides.
    pub fn for_node(node: &SchemaNode, config: &Config) -> Self {
        let flags = node.node_flags();
        if flags.contains(NodeFlags::CASE_INSENSITIVE) {
            CaseRule::Insensitive
        } else if flags.contains(NodeFlags::CASE_SENSITIVE) {
            CaseRule::Sensitive
        } else if config.case_insensitive {
            CaseRule::Insensitive
        } else {
            CaseRule::Sensitive
        }
    }

    /// Compare two strings under this rule
    pub fn matches(self, a: &str, b: &str) -> bool {
        match self {
            CaseRule::Sensitive => a == b,
            CaseRule::Insensitive => a.eq_ignore_ascii_case(b),
        }
    }
}

fn split_radix(digits: &str) -> (u32, &str) {
    if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        (16, hex)
    } else if let Some(oct) = digits
        .strip_prefix("0o")
        .or_else(|| digits.strip_prefix("0O"))
    {
        (8, oct)
    } else {
        (10, digits)
    }
}

fn parse_magnitude(digits: &str) -> Option<u64> {
    let (radix, digits) = split_radix(digits);
    // from_str_radix would accept a second sign
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    u64::from_str_radix(digits, radix).ok()
}

/// Parse a signed integer: optional sign, then decimal, `0x` hex or `0o` octal
///
/// ```
/// # use shaped_yaml::scalar::parse_int;
/// assert_eq!(parse_int("-0x10"), Some(-16));
/// assert_eq!(parse_int("+0o17"), Some(15));
/// assert_eq!(parse_int("-9223372036854775808"), Some(i64::MIN));
/// assert_eq!(parse_int("12abc"), None);
/// ```
pub fn parse_int(text: &str) -> Option<i64> {
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let magnitude = i128::from(parse_magnitude(digits)?);
    let value = if negative { -magnitude } else { magnitude };
    i64::try_from(value).ok()
}

/// Parse an unsigned integer: optional `+`, then decimal, `0x` hex or `0o` octal
///
/// ```
/// # use shaped_yaml::scalar::parse_uint;
/// assert_eq!(parse_uint("0xff"), Some(255));
/// assert_eq!(parse_uint("-1"), None);
/// ```
pub fn parse_uint(text: &str) -> Option<u64> {
    parse_magnitude(text.strip_prefix('+').unwrap_or(text))
}

/// Parse a float, including the YAML spellings of infinity and NaN
///
/// ```
/// # use shaped_yaml::scalar::parse_float;
/// assert_eq!(parse_float("1.5e3"), Some(1500.0));
/// assert_eq!(parse_float("-.inf"), Some(f64::NEG_INFINITY));
/// assert!(parse_float(".NaN").unwrap().is_nan());
/// assert_eq!(parse_float("one"), None);
/// ```
pub fn parse_float(text: &str) -> Option<f64> {
    match text {
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" => Some(f64::INFINITY),
        "-.inf" | "-.Inf" | "-.INF" => Some(f64::NEG_INFINITY),
        ".nan" | ".NaN" | ".NAN" => Some(f64::NAN),
        _ => text.parse().ok(),
    }
}

/// Render a float so that [`parse_float()`] reads back the same value
///
/// Four byte floats are rendered at single precision.
pub fn format_float(value: f64, size: usize) -> String {
    if value.is_nan() {
        ".nan".into()
    } else if value.is_infinite() {
        let text = if value > 0.0 { ".inf" } else { "-.inf" };
        text.into()
    } else {
        let mut text = if size == 4 {
            format!("{}", value as f32)
        } else {
            format!("{}", value)
        };
        // Keep the text a float literal, so `-0` does not read as an integer
        if !text.contains(['.', 'e', 'E']) {
            text.push_str(".0");
        }
        text
    }
}

const TRUE_WORDS: &[&str] = &["true", "yes", "on", "enable", "enabled", "1"];
const FALSE_WORDS: &[&str] = &["false", "no", "off", "disable", "disabled", "0"];

/// Parse a boolean literal
///
/// Literals are matched ignoring ASCII case unless the node is explicitly
/// `CASE_SENSITIVE` (and not also `CASE_INSENSITIVE`), in which case only
/// the lower case spellings are recognised.
///
/// ```
/// # use shaped_yaml::scalar::{parse_bool, CaseRule};
/// assert_eq!(parse_bool("Yes", CaseRule::Insensitive), Some(true));
/// assert_eq!(parse_bool("Yes", CaseRule::Sensitive), None);
/// assert_eq!(parse_bool("off", CaseRule::Sensitive), Some(false));
/// ```
pub fn parse_bool(text: &str, rule: CaseRule) -> Option<bool> {
    if TRUE_WORDS.iter().any(|w| rule.matches(w, text)) {
        Some(true)
    } else if FALSE_WORDS.iter().any(|w| rule.matches(w, text)) {
        Some(false)
    } else {
        None
    }
}

/// The case rule used for boolean literals on `node`
pub fn bool_case_rule(node: &SchemaNode) -> CaseRule {
    let flags = node.node_flags();
    if flags.contains(NodeFlags::CASE_SENSITIVE) && !flags.contains(NodeFlags::CASE_INSENSITIVE) {
        CaseRule::Sensitive
    } else {
        CaseRule::Insensitive
    }
}

/// Whether `text` is a null for `node`
///
/// Only nullable nodes have nulls.  The empty scalar is always null for
/// them; `null`, `Null`, `NULL` and `~` are null only for `NULLABLE_STRING`.
pub fn is_null(node: &SchemaNode, text: &str) -> bool {
    if !node.is_nullable() {
        return false;
    }
    text.is_empty()
        || (node.is_nullable_string() && matches!(text, "null" | "Null" | "NULL" | "~"))
}

/// The text written for a null on `node`
pub fn null_text(node: &SchemaNode) -> &'static str {
    if node.is_nullable_string() {
        "null"
    } else {
        ""
    }
}
