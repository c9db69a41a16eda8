//! Symbol descriptor parsing by suffix convention.
//!
//! Descriptors are language-independent: the indexer encodes the kind of a
//! symbol in the trailing characters of its last descriptor segment.
//! `().` is a method, `()` a function, `#` a class or type, `.` a variable
//! or term, `/` a module or namespace. Unparseable descriptors (including
//! `local N` symbols) are dropped — no entity, no edge.

use crate::model::EntityKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSymbol {
    pub name: String,
    pub kind: EntityKind,
    /// Enclosing descriptor segment name, when the descriptor is chained
    /// (e.g. the class name for `Class#method().`).
    pub parent: Option<String>,
}

/// Parse a full symbol string.
///
/// The wire symbol is `scheme manager package version descriptors`; only the
/// trailing descriptor chain matters here. Returns None for local symbols
/// and anything whose suffix does not match a known convention.
pub fn parse_symbol(symbol: &str) -> Option<ParsedSymbol> {
    let trimmed = symbol.trim();
    if trimmed.is_empty() || trimmed.starts_with("local ") {
        return None;
    }
    // Skip the space-separated header fields; descriptors never contain
    // unescaped spaces, so the last whitespace-separated token is the chain.
    let descriptors = trimmed.rsplit(' ').next()?;
    parse_descriptors(descriptors)
}

/// Parse a descriptor chain like `lib/Client#connect().`.
pub fn parse_descriptors(descriptors: &str) -> Option<ParsedSymbol> {
    let segments = split_segments(descriptors);
    let (last_name, kind) = classify_segment(segments.last()?)?;
    if last_name.is_empty() {
        return None;
    }
    let parent = if segments.len() >= 2 {
        classify_segment(&segments[segments.len() - 2])
            .map(|(name, _)| name)
            .filter(|name| !name.is_empty())
    } else {
        None
    };
    Some(ParsedSymbol {
        name: last_name,
        kind,
        parent,
    })
}

/// Split a descriptor chain at segment terminators (`/`, `#`, `.`), keeping
/// the terminator with its segment. Backtick-escaped names may contain any
/// of those characters and are kept intact.
fn split_segments(descriptors: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_escape = false;
    for ch in descriptors.chars() {
        current.push(ch);
        match ch {
            '`' => in_escape = !in_escape,
            '/' | '#' if !in_escape => {
                segments.push(std::mem::take(&mut current));
            }
            '.' if !in_escape => {
                // `connect().` keeps its trailing `.` in the segment, so the
                // method suffix survives for classify_segment.
                segments.push(std::mem::take(&mut current));
            }
            _ => {}
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Map one descriptor segment to (name, kind) by its suffix.
fn classify_segment(segment: &str) -> Option<(String, EntityKind)> {
    let seg = segment.trim();
    if let Some(name) = seg.strip_suffix("().") {
        return Some((unescape(name), EntityKind::Method));
    }
    if let Some(name) = seg.strip_suffix("()") {
        return Some((unescape(name), EntityKind::Function));
    }
    if let Some(name) = seg.strip_suffix('#') {
        return Some((unescape(name), EntityKind::Class));
    }
    if let Some(name) = seg.strip_suffix('.') {
        return Some((unescape(name), EntityKind::Variable));
    }
    if let Some(name) = seg.strip_suffix('/') {
        return Some((unescape(name), EntityKind::Module));
    }
    None
}

fn unescape(name: &str) -> String {
    let trimmed = name.trim_matches('`');
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_conventions() {
        let sym = parse_symbol("scip-typescript npm pkg 1.0.0 lib/`Client`#connect().").unwrap();
        assert_eq!(sym.name, "connect");
        assert_eq!(sym.kind, EntityKind::Method);
        assert_eq!(sym.parent.as_deref(), Some("Client"));

        let sym = parse_symbol("scip-python pypi pkg 1.0 app/main().").unwrap();
        assert_eq!(sym.kind, EntityKind::Method);

        let sym = parse_descriptors("util/helper()").unwrap();
        assert_eq!(sym.name, "helper");
        assert_eq!(sym.kind, EntityKind::Function);
        assert_eq!(sym.parent.as_deref(), Some("util"));

        let sym = parse_descriptors("models/User#").unwrap();
        assert_eq!(sym.name, "User");
        assert_eq!(sym.kind, EntityKind::Class);

        let sym = parse_descriptors("config/TIMEOUT.").unwrap();
        assert_eq!(sym.name, "TIMEOUT");
        assert_eq!(sym.kind, EntityKind::Variable);

        let sym = parse_descriptors("app/routes/").unwrap();
        assert_eq!(sym.name, "routes");
        assert_eq!(sym.kind, EntityKind::Module);
    }

    #[test]
    fn locals_and_garbage_dropped() {
        assert!(parse_symbol("local 12").is_none());
        assert!(parse_symbol("").is_none());
        assert!(parse_descriptors("noterminator").is_none());
    }

    #[test]
    fn escaped_names_keep_separators() {
        let sym = parse_descriptors("lib/`weird.name`#").unwrap();
        assert_eq!(sym.name, "weird.name");
        assert_eq!(sym.kind, EntityKind::Class);
    }
}
