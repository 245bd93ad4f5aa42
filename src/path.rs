//! Path syntax shared by patterns, aliases and the path index.
//!
//! A path is a `.`-separated list of segments rooted at [`ROOT`]. A segment is
//! a key optionally followed by one or more array subscripts, each either a
//! concrete index (`items[3]`) or a wildcard (`items[*]`). Concrete paths are
//! produced by the walker and never contain `*`.

/// Name of the document root segment.
pub const ROOT: &str = "root";

/// Textual wildcard subscript.
pub const WILDCARD: &str = "[*]";

/// One array subscript of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscript {
    At(usize),
    Any,
}

/// A parsed path segment such as `transactions[*]` or `matrix[0][2]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<'a> {
    pub key: &'a str,
    pub subscripts: Vec<Subscript>,
}

impl<'a> Segment<'a> {
    /// Parse a single segment, returning a human readable reason on failure.
    pub fn parse(raw: &'a str) -> Result<Self, String> {
        let (key, mut rest) = match raw.find('[') {
            Some(pos) => raw.split_at(pos),
            None => (raw, ""),
        };
        if key.is_empty() {
            return Err(format!("segment '{raw}' has no key"));
        }
        if key.contains(']') {
            return Err(format!("unbalanced ']' in segment '{raw}'"));
        }

        let mut subscripts = Vec::new();
        while !rest.is_empty() {
            let Some(inner) = rest.strip_prefix('[') else {
                return Err(format!("unexpected text after subscript in '{raw}'"));
            };
            let Some(close) = inner.find(']') else {
                return Err(format!("unclosed '[' in segment '{raw}'"));
            };
            let body = &inner[..close];
            let subscript = if body == "*" {
                Subscript::Any
            } else if !body.is_empty() && body.bytes().all(|b| b.is_ascii_digit()) {
                let index = body
                    .parse::<usize>()
                    .map_err(|e| format!("bad index '{body}' in '{raw}': {e}"))?;
                Subscript::At(index)
            } else {
                return Err(format!("subscript '[{body}]' in '{raw}' is neither an index nor '*'"));
            };
            subscripts.push(subscript);
            rest = &inner[close + 1..];
        }

        Ok(Segment { key, subscripts })
    }

    pub fn has_wildcard(&self) -> bool {
        self.subscripts.contains(&Subscript::Any)
    }
}

/// Iterate the raw segments of a path.
pub fn segments(path: &str) -> std::str::Split<'_, char> {
    path.split('.')
}

/// Number of segments in a path.
pub fn depth(path: &str) -> usize {
    segments(path).count()
}

/// Key part of a raw segment (`items[2]` -> `items`).
pub fn base_key(segment: &str) -> &str {
    match segment.find('[') {
        Some(pos) => &segment[..pos],
        None => segment,
    }
}

pub fn has_wildcard(path: &str) -> bool {
    path.contains(WILDCARD)
}

/// The alias minus its final field segment; single-segment aliases map to the root.
pub fn prefix(alias: &str) -> &str {
    match alias.rsplit_once('.') {
        Some((head, _)) => head,
        None => ROOT,
    }
}

/// The path one level up, or `None` for a single-segment path.
pub fn parent(path: &str) -> Option<&str> {
    path.rsplit_once('.').map(|(head, _)| head)
}

/// Whether a document key can appear as a path segment.
///
/// Keys that are empty or contain `.`, `[`, `]` or `*` would be read back as a
/// different path (`"a.b"` as the nested `a`.`b`), so they are never indexed.
pub fn is_addressable_key(key: &str) -> bool {
    !key.is_empty() && !key.contains(['.', '[', ']', '*'])
}

pub fn child_key(parent: &str, key: &str) -> String {
    let mut path = String::with_capacity(parent.len() + key.len() + 1);
    path.push_str(parent);
    path.push('.');
    path.push_str(key);
    path
}

pub fn child_index(parent: &str, index: usize) -> String {
    format!("{parent}[{index}]")
}

/// Replace every concrete subscript with a wildcard.
pub fn generalize(concrete: &str) -> String {
    let mut out = String::with_capacity(concrete.len());
    let mut chars = concrete.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(c);
        if c == '[' && chars.peek().is_some_and(|d| d.is_ascii_digit()) {
            while chars.peek().is_some_and(|d| d.is_ascii_digit()) {
                chars.next();
            }
            out.push('*');
        }
    }
    out
}

/// Validate every segment of an alias.
pub fn validate(alias: &str) -> Result<(), String> {
    if alias.is_empty() {
        return Err("alias is empty".to_string());
    }
    for raw in segments(alias) {
        Segment::parse(raw)?;
    }
    Ok(())
}
