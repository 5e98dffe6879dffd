//! Line classification
//!
//! Each line of a dump is matched against one regex covering both grammars:
//!
//! ```text
//! Declaration:  <package>.<section>=<kind>
//! Assignment:   <package>.<section>.<option>=<value>
//! ```
//!
//! The declaration alternative is tried first, so `pkg.sec=a.b` is a
//! declaration of kind `a.b` and never an assignment. Section ids are either
//! plain names or the anonymous form `@<kind>[<index>]`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<package>[^.]+)\.(?:(?P<section>[^.=]+)|(?P<owner>[^.]+)\.(?P<option>[^.=]+))=(?P<value>.*)$",
    )
    .expect("uci line pattern is valid")
});

static ANONYMOUS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@(?P<kind>[^\[]+)\[(?P<index>[0-9]+)\]$").expect("anonymous pattern is valid"));

/// How a section is addressed in a dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionId<'a> {
    /// `network.wan`, addressed by a caller-chosen name
    Named(&'a str),
    /// `network.@device[0]`, addressed by its position among sections of `kind`
    Anonymous { kind: &'a str, index: usize },
}

impl<'a> SectionId<'a> {
    /// Parse a section id. Returns `None` for an anonymous id whose bracket
    /// index is missing, non-numeric, or too large.
    pub fn parse(raw: &'a str) -> Option<Self> {
        if !raw.starts_with('@') {
            return Some(SectionId::Named(raw));
        }

        let caps = ANONYMOUS_RE.captures(raw)?;
        let kind = caps.name("kind")?.as_str();
        let index = caps.name("index")?.as_str().parse().ok()?;
        Some(SectionId::Anonymous { kind, index })
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, SectionId::Anonymous { .. })
    }

    /// Bracket index of an anonymous id
    pub fn index(&self) -> Option<usize> {
        match self {
            SectionId::Named(_) => None,
            SectionId::Anonymous { index, .. } => Some(*index),
        }
    }

    /// Key used when the section lives in a keyed group.
    ///
    /// Anonymous sections are keyed by their decimal index (`"0"`, `"1"`, ...).
    pub fn key(&self) -> String {
        match self {
            SectionId::Named(name) => (*name).to_string(),
            SectionId::Anonymous { index, .. } => index.to_string(),
        }
    }
}

impl fmt::Display for SectionId<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionId::Named(name) => f.write_str(name),
            SectionId::Anonymous { kind, index } => write!(f, "@{}[{}]", kind, index),
        }
    }
}

/// One classified line of a dump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    /// `<package>.<section>=<kind>`
    Declaration {
        package: &'a str,
        section: SectionId<'a>,
        kind: &'a str,
    },
    /// `<package>.<section>.<option>=<value>`
    Assignment {
        package: &'a str,
        section: SectionId<'a>,
        option: &'a str,
        value: &'a str,
    },
    /// Anything else: blank lines, comments, malformed entries
    Unrecognized,
}

impl Line<'_> {
    pub fn is_unrecognized(&self) -> bool {
        matches!(self, Line::Unrecognized)
    }
}

/// Classify a single line (without its trailing newline).
pub fn classify(line: &str) -> Line<'_> {
    let Some(caps) = LINE_RE.captures(line) else {
        return Line::Unrecognized;
    };

    let (Some(package), Some(value)) = (caps.name("package"), caps.name("value")) else {
        return Line::Unrecognized;
    };
    let package = package.as_str();
    let value = unquote(value.as_str());

    if let Some(section) = caps.name("section") {
        return match SectionId::parse(section.as_str()) {
            Some(section) => Line::Declaration {
                package,
                section,
                kind: value,
            },
            None => Line::Unrecognized,
        };
    }

    match (caps.name("owner"), caps.name("option")) {
        (Some(owner), Some(option)) => match SectionId::parse(owner.as_str()) {
            Some(section) => Line::Assignment {
                package,
                section,
                option: option.as_str(),
                value,
            },
            None => Line::Unrecognized,
        },
        _ => Line::Unrecognized,
    }
}

/// Strip one leading and one trailing single quote, each when present.
fn unquote(value: &str) -> &str {
    let value = value.strip_prefix('\'').unwrap_or(value);
    value.strip_suffix('\'').unwrap_or(value)
}
