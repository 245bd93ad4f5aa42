//! Binding alias wildcards to the array frames of the node being visited.

use crate::path::{self, Segment, Subscript};

/// Substitute each wildcard segment of `alias` with the concrete index found
/// in `current` under the same key.
///
/// Literal alias segments are copied through and advance the cursor over
/// `current` only on an exact match. A wildcard segment scans forward from the
/// cursor for the first segment with the same key and subscript arity, so
/// aliases may skip structural segments present in `current`. Returns `None`
/// when some wildcard cannot be bound.
pub fn resolve(alias: &str, current: &str) -> Option<String> {
    if !path::has_wildcard(alias) {
        return Some(alias.to_string());
    }

    let current: Vec<&str> = path::segments(current).collect();
    let mut cursor = 0;
    let mut resolved = String::with_capacity(alias.len() + 8);

    for (position, raw) in path::segments(alias).enumerate() {
        if position > 0 {
            resolved.push('.');
        }

        if !path::has_wildcard(raw) {
            resolved.push_str(raw);
            if current.get(cursor) == Some(&raw) {
                cursor += 1;
            }
            continue;
        }

        let wanted = Segment::parse(raw).ok()?;
        let (offset, indices) = current[cursor..]
            .iter()
            .enumerate()
            .find_map(|(offset, candidate)| bind(&wanted, candidate).map(|i| (offset, i)))?;

        resolved.push_str(wanted.key);
        for index in indices {
            resolved.push('[');
            resolved.push_str(&index.to_string());
            resolved.push(']');
        }
        cursor += offset + 1;
    }

    Some(resolved)
}

/// Concrete indices for `wanted` if `candidate` is a frame of the same array.
fn bind(wanted: &Segment<'_>, candidate: &str) -> Option<Vec<usize>> {
    if path::base_key(candidate) != wanted.key {
        return None;
    }
    let concrete = Segment::parse(candidate).ok()?;
    if concrete.subscripts.len() != wanted.subscripts.len() {
        return None;
    }

    wanted
        .subscripts
        .iter()
        .zip(&concrete.subscripts)
        .map(|(want, have)| match (want, have) {
            (Subscript::Any, Subscript::At(index)) => Some(*index),
            (Subscript::At(expected), Subscript::At(index)) if expected == index => Some(*index),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("root.items[*].id", "root.items[3]", Some("root.items[3].id"))]
    #[case(
        "root.items[*].transactions[*].amount",
        "root.items[1].transactions[0]",
        Some("root.items[1].transactions[0].amount")
    )]
    #[case("root.items[*].id", "root.items[2].transactions[5]", Some("root.items[2].id"))]
    #[case("root.id", "root.items[2]", Some("root.id"))]
    #[case("root.items[*].id", "root", None)]
    #[case("root.items[*].id", "root.orders[0]", None)]
    #[case("root.lines[*].qty", "root.order.lines[4]", Some("root.lines[4].qty"))]
    #[case("root.grid[*][*].v", "root.grid[1][7]", Some("root.grid[1][7].v"))]
    #[case("root.grid[0][*].v", "root.grid[1][7]", None)]
    #[case("root.grid[*].v", "root.grid[1][7]", None)]
    fn test_resolve(#[case] alias: &str, #[case] current: &str, #[case] expected: Option<&str>) {
        assert_eq!(resolve(alias, current).as_deref(), expected);
    }

    #[test]
    fn test_wildcards_bind_in_traversal_order() {
        // Same key nested twice: the outer wildcard takes the outer frame.
        let resolved = resolve("root.node[*].node[*].name", "root.node[2].node[5]");
        assert_eq!(resolved.as_deref(), Some("root.node[2].node[5].name"));
    }

    #[test]
    fn test_second_wildcard_needs_remaining_frame() {
        assert_eq!(resolve("root.node[*].node[*].name", "root.node[2]"), None);
    }
}
