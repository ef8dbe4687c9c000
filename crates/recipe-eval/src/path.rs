//! Minimal dotted-path/index access over `serde_json::Value`.
//!
//! Deliberately not a general expression parser (spec §9 design note):
//! just `ident`, `ident.ident`, and `ident[0]` chained with `.`.

use serde_json::Value;

/// Resolve `path` (e.g. `result.files[0].path`) against `root`. Returns
/// `None` on any missing segment or type mismatch — callers degrade this
/// to "undefined"/`false` rather than propagating an error (spec §4.2,
/// §4.3: evaluation errors are never fatal).
pub fn resolve<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in split_segments(path) {
        current = match segment {
            Segment::Field(name) => current.get(name)?,
            Segment::Index(idx) => current.get(idx)?,
        };
    }
    Some(current)
}

enum Segment<'a> {
    Field(&'a str),
    Index(usize),
}

fn split_segments(path: &str) -> impl Iterator<Item = Segment<'_>> {
    path.split('.').flat_map(|part| {
        let mut segments = Vec::new();
        let mut rest = part;
        if let Some(bracket) = rest.find('[') {
            let (field, tail) = rest.split_at(bracket);
            if !field.is_empty() {
                segments.push(Segment::Field(field));
            }
            rest = tail;
            while let Some(end) = rest.find(']') {
                let idx_str = &rest[1..end];
                if let Ok(idx) = idx_str.parse::<usize>() {
                    segments.push(Segment::Index(idx));
                }
                rest = &rest[end + 1..];
            }
        } else if !field_is_empty(rest) {
            segments.push(Segment::Field(rest));
        }
        segments
    })
}

fn field_is_empty(s: &str) -> bool {
    s.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_simple_field() {
        let v = json!({ "name": "world" });
        assert_eq!(resolve(&v, "name"), Some(&json!("world")));
    }

    #[test]
    fn resolves_nested_field() {
        let v = json!({ "result": { "status": "ok" } });
        assert_eq!(resolve(&v, "result.status"), Some(&json!("ok")));
    }

    #[test]
    fn resolves_array_index() {
        let v = json!({ "files": ["a.txt", "b.txt"] });
        assert_eq!(resolve(&v, "files[0]"), Some(&json!("a.txt")));
    }

    #[test]
    fn resolves_nested_field_after_index() {
        let v = json!({ "files": [{ "path": "a.txt" }] });
        assert_eq!(resolve(&v, "files[0].path"), Some(&json!("a.txt")));
    }

    #[test]
    fn missing_segment_is_none() {
        let v = json!({ "a": 1 });
        assert_eq!(resolve(&v, "b.c"), None);
    }

    use proptest::prelude::*;

    proptest! {
        /// Any chain of field names, nested arbitrarily deep, resolves back
        /// to the leaf value it was built around (spec §4.3 dotted-path
        /// access).
        #[test]
        fn nested_field_chains_always_resolve_to_their_leaf(
            names in proptest::collection::vec("[a-z]{1,6}", 1..6),
            leaf in any::<i64>(),
        ) {
            let mut value = json!(leaf);
            for name in names.iter().rev() {
                value = json!({ name.clone(): value });
            }
            let path = names.join(".");
            prop_assert_eq!(resolve(&value, &path), Some(&json!(leaf)));
        }
    }
}
