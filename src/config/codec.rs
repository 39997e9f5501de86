//! Codec for the game server's single-line option blob.
//!
//! # Grammar
//! ```text
//! [/Script/Pal.PalGameWorldSettings]
//! OptionSettings=(Key=Value,Name="text, with commas",Tags=(a,b),Flag=True)
//! ```
//!
//! # Design Decisions
//! - Hand-rolled scanner: quoted and parenthesised spans are scan-balanced,
//!   so embedded commas never split a value
//! - Every value is typed once on parse and renders back from its kind
//! - Group members stay raw text, nested spans are carried verbatim

use std::fmt;
use std::str::FromStr;

use crate::config::loader::ConfigError;

/// The closed set of value kinds understood by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    String,
    Group,
    Literal,
}

impl ValueKind {
    pub const ALL: [ValueKind; 6] = [
        ValueKind::Bool,
        ValueKind::Int,
        ValueKind::Float,
        ValueKind::String,
        ValueKind::Group,
        ValueKind::Literal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::Group => "group",
            ValueKind::Literal => "literal",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ValueKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnknownKind(s.to_string()))
    }
}

/// A typed option value. The variant decides how it is written back.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Raw, untyped members of a parenthesised group.
    Group(Vec<String>),
    /// Opaque text re-emitted unchanged (enum-like values such as `None`).
    Literal(String),
}

impl ConfigValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            ConfigValue::Bool(_) => ValueKind::Bool,
            ConfigValue::Int(_) => ValueKind::Int,
            ConfigValue::Float(_) => ValueKind::Float,
            ConfigValue::String(_) => ValueKind::String,
            ConfigValue::Group(_) => ValueKind::Group,
            ConfigValue::Literal(_) => ValueKind::Literal,
        }
    }

    /// Infer the kind of a raw value as found in the option blob.
    ///
    /// Checked in order, first match wins: bool, int, string, group, float, literal.
    pub fn infer(raw: &str) -> Self {
        let raw = raw.trim();

        if raw.eq_ignore_ascii_case("true") {
            return ConfigValue::Bool(true);
        }
        if raw.eq_ignore_ascii_case("false") {
            return ConfigValue::Bool(false);
        }
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            // Out-of-range integers keep their exact text.
            return match raw.parse::<i64>() {
                Ok(n) => ConfigValue::Int(n),
                Err(_) => ConfigValue::Literal(raw.to_string()),
            };
        }
        if raw.starts_with('"') {
            return ConfigValue::String(raw.trim_matches('"').to_string());
        }
        if let Some(inner) = raw.strip_prefix('(') {
            let inner = inner.strip_suffix(')').unwrap_or(inner);
            return ConfigValue::Group(split_group(inner));
        }
        if raw.contains('.') {
            if let Ok(f) = raw.parse::<f64>() {
                if f.is_finite() {
                    return ConfigValue::Float(f);
                }
            }
        }
        ConfigValue::Literal(raw.to_string())
    }

    /// Build a value of an explicit kind from user input.
    ///
    /// Returns the reason on rejection. Strings lose embedded quote characters.
    pub fn from_kind(kind: ValueKind, raw: &str) -> Result<Self, String> {
        match kind {
            ValueKind::Bool => {
                let raw = raw.trim();
                if raw.eq_ignore_ascii_case("true") {
                    Ok(ConfigValue::Bool(true))
                } else if raw.eq_ignore_ascii_case("false") {
                    Ok(ConfigValue::Bool(false))
                } else {
                    Err(format!("'{}' is not true or false", raw))
                }
            }
            ValueKind::Int => raw
                .trim()
                .parse::<i64>()
                .map(ConfigValue::Int)
                .map_err(|e| e.to_string())
                .and_then(|value| value.check_writable().map(|()| value)),
            ValueKind::Float => match raw.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(ConfigValue::Float(f)),
                Ok(_) => Err("value must be finite".to_string()),
                Err(e) => Err(e.to_string()),
            },
            ValueKind::String => Ok(ConfigValue::String(raw.replace('"', ""))),
            ValueKind::Group => {
                let raw = raw.trim();
                let inner = raw
                    .strip_prefix('(')
                    .and_then(|r| r.strip_suffix(')'))
                    .unwrap_or(raw);
                let value = ConfigValue::Group(split_group(inner));
                value.check_writable()?;
                Ok(value)
            }
            ValueKind::Literal => {
                let value = ConfigValue::Literal(raw.trim().to_string());
                value.check_writable()?;
                Ok(value)
            }
        }
    }

    /// Check that the rendered text parses back as the same kind.
    ///
    /// Strings are not checked here; callers strip their quotes.
    pub fn check_writable(&self) -> Result<(), String> {
        match self {
            ConfigValue::Int(n) if *n < 0 => {
                Err(format!("{} is negative, integers are plain digits", n))
            }
            ConfigValue::Group(members) => members.iter().try_for_each(|member| {
                match unbalanced(member) {
                    Some(c) => Err(format!("group member '{}' has an unbalanced '{}'", member, c)),
                    None => Ok(()),
                }
            }),
            ConfigValue::Literal(s) => {
                match s.chars().find(|c| matches!(c, ',' | '=' | '"' | '(' | ')')) {
                    Some(c) => Err(format!("literal values cannot contain '{}'", c)),
                    None => Ok(()),
                }
            }
            _ => Ok(()),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Text payload of string and literal values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) | ConfigValue::Literal(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&[String]> {
        match self {
            ConfigValue::Group(members) => Some(members),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // The game only accepts this exact capitalisation.
            ConfigValue::Bool(true) => f.write_str("True"),
            ConfigValue::Bool(false) => f.write_str("False"),
            ConfigValue::Int(n) => write!(f, "{}", n),
            ConfigValue::Float(v) => f.write_str(&render_float(*v)),
            ConfigValue::String(s) => write!(f, "\"{}\"", s),
            ConfigValue::Group(members) => write!(f, "({})", members.join(",")),
            ConfigValue::Literal(s) => f.write_str(s),
        }
    }
}

/// Floats always carry a `.` so they infer as floats again.
fn render_float(v: f64) -> String {
    let s = v.to_string();
    if s.contains('.') {
        s
    } else {
        format!("{}.0", s)
    }
}

/// One key/value pair of the option blob.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigEntry {
    pub key: String,
    pub value: ConfigValue,
}

impl ConfigEntry {
    pub fn new(key: impl Into<String>, value: ConfigValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    pub fn kind(&self) -> ValueKind {
        self.value.kind()
    }
}

/// Replace the value of an existing key in place, or append a new entry.
pub fn upsert(entries: &mut Vec<ConfigEntry>, key: &str, value: ConfigValue) {
    match entries.iter_mut().find(|e| e.key == key) {
        Some(entry) => entry.value = value,
        None => entries.push(ConfigEntry::new(key, value)),
    }
}

/// Scanner state between characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Span {
    Outside,
    Quoted,
    Group { depth: usize, quoted: bool },
}

impl Span {
    /// Advance over one character that belongs to an open span.
    fn step(self, c: char) -> Span {
        match self {
            Span::Outside => Span::Outside,
            Span::Quoted if c == '"' => Span::Outside,
            Span::Quoted => Span::Quoted,
            Span::Group { depth, quoted } => match c {
                '"' => Span::Group { depth, quoted: !quoted },
                '(' if !quoted => Span::Group { depth: depth + 1, quoted },
                ')' if !quoted && depth == 1 => Span::Outside,
                ')' if !quoted => Span::Group { depth: depth - 1, quoted },
                _ => self,
            },
        }
    }
}

/// Split an option blob (the text between the outer parentheses) into raw pairs.
fn tokenize(blob: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut buffer = String::new();
    let mut key: Option<String> = None;
    let mut span = Span::Outside;

    for c in blob.chars() {
        if span != Span::Outside {
            buffer.push(c);
            span = span.step(c);
            continue;
        }
        match c {
            '=' => {
                key = Some(buffer.trim().to_string());
                buffer.clear();
            }
            ',' => {
                flush(&mut pairs, key.take(), &buffer);
                buffer.clear();
            }
            '"' => {
                span = Span::Quoted;
                buffer.push(c);
            }
            '(' => {
                span = Span::Group { depth: 1, quoted: false };
                buffer.push(c);
            }
            _ => buffer.push(c),
        }
    }
    flush(&mut pairs, key.take(), &buffer);

    pairs
}

fn flush(pairs: &mut Vec<(String, String)>, key: Option<String>, buffer: &str) {
    match key {
        Some(key) if !key.is_empty() => pairs.push((key, buffer.trim().to_string())),
        _ => {
            if !buffer.trim().is_empty() {
                tracing::debug!(fragment = %buffer.trim(), "Ignoring option fragment without a key");
            }
        }
    }
}

/// First quote or parenthesis left open (or closed without opening) in a group member.
fn unbalanced(member: &str) -> Option<char> {
    let mut depth = 0usize;
    let mut quoted = false;

    for c in member.chars() {
        match c {
            '"' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return Some(')'),
            },
            _ => {}
        }
    }

    if quoted {
        Some('"')
    } else if depth > 0 {
        Some('(')
    } else {
        None
    }
}

/// Split group contents on top-level commas, leaving members untouched.
fn split_group(inner: &str) -> Vec<String> {
    if inner.trim().is_empty() {
        return Vec::new();
    }

    let mut members = Vec::new();
    let mut current = String::new();
    let mut span = Span::Outside;

    for c in inner.chars() {
        if span == Span::Outside {
            match c {
                ',' => {
                    members.push(std::mem::take(&mut current));
                    continue;
                }
                '"' => span = Span::Quoted,
                '(' => span = Span::Group { depth: 1, quoted: false },
                _ => {}
            }
        } else {
            span = span.step(c);
        }
        current.push(c);
    }
    members.push(current);

    members
}

/// Parse an option blob into ordered, typed entries.
///
/// A repeated key keeps its first position and its last value.
pub fn parse(blob: &str) -> Vec<ConfigEntry> {
    let mut entries = Vec::new();
    for (key, raw) in tokenize(blob) {
        upsert(&mut entries, &key, ConfigValue::infer(&raw));
    }
    entries
}

/// Render entries back into an option blob (without the outer parentheses).
pub fn serialize(entries: &[ConfigEntry]) -> String {
    entries
        .iter()
        .map(|entry| format!("{}={}", entry.key, entry.value))
        .collect::<Vec<_>>()
        .join(",")
}

/// Locate the option line in a settings document and return its blob.
///
/// `None` when the document has no option line; `Some(Err)` when the line
/// exists but is not shaped like `KEY=(...)`.
pub fn find_option_blob<'a>(document: &'a str, option_key: &str) -> Option<Result<&'a str, String>> {
    let line = document.lines().map(str::trim).find(|line| {
        line.strip_prefix(option_key)
            .map(|rest| rest.trim_start().starts_with('='))
            .unwrap_or(false)
    })?;

    let value = line[option_key.len()..].trim_start()[1..].trim();
    let blob = value
        .strip_prefix('(')
        .and_then(|v| v.strip_suffix(')'))
        .ok_or_else(|| format!("expected {}=(...), found '{}'", option_key, value));

    Some(blob)
}

/// Render a complete settings document.
pub fn render_document(header: &str, option_key: &str, entries: &[ConfigEntry]) -> String {
    format!("[{}]\n{}=({})\n", header, option_key, serialize(entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_LINE: &str = "Difficulty=None,DayTimeSpeedRate=1.000000,ExpRate=1.500000,\
        bEnablePlayerToPlayerDamage=False,DeathPenalty=All,CoopPlayerMaxNum=4,\
        ServerName=\"Default Palworld Server\",ServerDescription=\"\",AdminPassword=\"\",\
        PublicPort=8211,RCONEnabled=False,RCONPort=25575,bUseAuth=True,\
        BanListURL=\"https://api.palworldgame.com/api/banlist.txt\",RESTAPIEnabled=False,\
        RESTAPIPort=8212,CrossplayPlatforms=(Steam,Xbox,PS5,Mac)";

    #[test]
    fn test_type_inference() {
        assert_eq!(ConfigValue::infer("true"), ConfigValue::Bool(true));
        assert_eq!(ConfigValue::infer("FALSE"), ConfigValue::Bool(false));
        assert_eq!(ConfigValue::infer("42"), ConfigValue::Int(42));
        assert_eq!(ConfigValue::infer("3.5"), ConfigValue::Float(3.5));
        assert_eq!(ConfigValue::infer("\"hi\""), ConfigValue::String("hi".into()));
        assert_eq!(
            ConfigValue::infer("(a,b)"),
            ConfigValue::Group(vec!["a".into(), "b".into()])
        );
        assert_eq!(ConfigValue::infer("foo"), ConfigValue::Literal("foo".into()));
    }

    #[test]
    fn test_inference_edge_cases() {
        assert_eq!(ConfigValue::infer("-1"), ConfigValue::Literal("-1".into()));
        assert_eq!(ConfigValue::infer("1.2.3"), ConfigValue::Literal("1.2.3".into()));
        assert_eq!(ConfigValue::infer(""), ConfigValue::Literal(String::new()));
        assert_eq!(ConfigValue::infer("()"), ConfigValue::Group(Vec::new()));
        assert_eq!(
            ConfigValue::infer("99999999999999999999"),
            ConfigValue::Literal("99999999999999999999".into())
        );
    }

    #[test]
    fn test_embedded_comma_and_group() {
        let entries = parse("Name=\"a,b\",Tags=(x,y),Flag=True");
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], ConfigEntry::new("Name", ConfigValue::String("a,b".into())));
        assert_eq!(
            entries[1],
            ConfigEntry::new("Tags", ConfigValue::Group(vec!["x".into(), "y".into()]))
        );
        assert_eq!(entries[2], ConfigEntry::new("Flag", ConfigValue::Bool(true)));
    }

    #[test]
    fn test_pathological_option_line() {
        let document = "[/Script/Pal.PalGameWorldSettings]\n\
            OptionSettings=(Name=\"a,b\",Tags=(x,y),Flag=True)\n";
        let blob = find_option_blob(document, "OptionSettings").unwrap().unwrap();
        let entries = parse(blob);
        let keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["Name", "Tags", "Flag"]);
        assert_eq!(entries[0].value.as_str(), Some("a,b"));
    }

    #[test]
    fn test_nested_group_is_kept_verbatim() {
        let entries = parse("Outer=(a,(b,c),\"d,e\"),Next=1");
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0].value,
            ConfigValue::Group(vec!["a".into(), "(b,c)".into(), "\"d,e\"".into()])
        );
        assert_eq!(serialize(&entries), "Outer=(a,(b,c),\"d,e\"),Next=1");
    }

    #[test]
    fn test_round_trip_preserves_order_and_kinds() {
        let entries = parse(DEFAULT_LINE);
        assert_eq!(entries.len(), 17);
        let reparsed = parse(&serialize(&entries));
        assert_eq!(reparsed, entries);
        assert_eq!(entries[0].kind(), ValueKind::Literal);
        assert_eq!(entries[1].kind(), ValueKind::Float);
        assert_eq!(entries[3].kind(), ValueKind::Bool);
    }

    #[test]
    fn test_serialization_per_kind() {
        let entries = vec![
            ConfigEntry::new("A", ConfigValue::Bool(true)),
            ConfigEntry::new("B", ConfigValue::Int(7)),
            ConfigEntry::new("C", ConfigValue::Float(1.0)),
            ConfigEntry::new("D", ConfigValue::String("x y".into())),
            ConfigEntry::new("E", ConfigValue::Group(vec!["p".into(), "q".into()])),
            ConfigEntry::new("F", ConfigValue::Literal("None".into())),
        ];
        assert_eq!(serialize(&entries), "A=True,B=7,C=1.0,D=\"x y\",E=(p,q),F=None");
        assert_eq!(parse(&serialize(&entries)), entries);
    }

    #[test]
    fn test_trailing_comma_and_orphan_fragment() {
        let entries = parse("A=1,");
        assert_eq!(entries, vec![ConfigEntry::new("A", ConfigValue::Int(1))]);

        let entries = parse("orphan,B=2");
        assert_eq!(entries, vec![ConfigEntry::new("B", ConfigValue::Int(2))]);

        assert!(parse("").is_empty());
    }

    #[test]
    fn test_duplicate_key_keeps_first_position() {
        let entries = parse("A=1,B=2,A=3");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], ConfigEntry::new("A", ConfigValue::Int(3)));
    }

    #[test]
    fn test_find_option_blob() {
        assert!(find_option_blob("[Header]\n", "OptionSettings").is_none());
        assert!(find_option_blob("OptionSettingsExtra=(A=1)", "OptionSettings").is_none());
        assert_eq!(
            find_option_blob("[H]\r\nOptionSettings=(A=1)\r\n", "OptionSettings"),
            Some(Ok("A=1"))
        );
        assert!(matches!(
            find_option_blob("OptionSettings=A=1", "OptionSettings"),
            Some(Err(_))
        ));
    }

    #[test]
    fn test_from_kind_validation() {
        assert_eq!(
            ConfigValue::from_kind(ValueKind::String, "say \"hi\""),
            Ok(ConfigValue::String("say hi".into()))
        );
        assert_eq!(
            ConfigValue::from_kind(ValueKind::Group, "(Steam,Xbox)"),
            Ok(ConfigValue::Group(vec!["Steam".into(), "Xbox".into()]))
        );
        assert!(ConfigValue::from_kind(ValueKind::Int, "abc").is_err());
        assert!(ConfigValue::from_kind(ValueKind::Bool, "yes").is_err());
        assert!(ConfigValue::from_kind(ValueKind::Float, "inf").is_err());
        assert!(ConfigValue::from_kind(ValueKind::Literal, "a,b").is_err());
        assert!(ConfigValue::from_kind(ValueKind::Int, "-5").is_err());
        assert!(ConfigValue::from_kind(ValueKind::Group, "a\"b").is_err());
        assert!(ConfigValue::from_kind(ValueKind::Group, "(a,(b)").is_err());
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("Bool".parse::<ValueKind>().unwrap(), ValueKind::Bool);
        assert_eq!("literal".parse::<ValueKind>().unwrap(), ValueKind::Literal);
        assert!(matches!(
            "number".parse::<ValueKind>(),
            Err(ConfigError::UnknownKind(k)) if k == "number"
        ));
    }
}
