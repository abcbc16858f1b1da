//! Shallow extraction of text from nested/array-shaped document fields.
//!
//! This is a deliberately lossy heuristic, not a path query language: when a
//! hop lands on an array, only its FIRST element is followed. Missing hops and
//! unexpected shapes (including heterogeneous array elements) fall back to an
//! empty string, which the backfill then embeds as-is.

use mongodb::bson::{Bson, Document};

/// Resolves a dot-separated `path` inside `doc` to a text value.
///
/// - Intermediate array hops resolve to the first element only.
/// - A missing hop or a non-document intermediate yields `""`.
/// - A terminal array is joined with `", "`; terminal scalars are rendered
///   and trimmed.
pub fn shallow_extract(doc: &Document, path: &str) -> String {
    let segments: Vec<&str> = path.split('.').collect();
    let last = segments.len() - 1;

    let mut current = doc;
    for (i, seg) in segments.iter().enumerate() {
        let mut value = match current.get(*seg) {
            Some(v) => v,
            None => return String::new(),
        };

        // First-element-only traversal for intermediate arrays.
        if i < last {
            if let Bson::Array(items) = value {
                value = match items.first() {
                    Some(v) => v,
                    None => return String::new(),
                };
            }
            match value {
                Bson::Document(next) => current = next,
                _ => return String::new(),
            }
        } else {
            return render_value(value);
        }
    }
    String::new()
}

/// Renders a terminal value as text. Arrays join their scalar elements with
/// `", "`; nulls render empty.
pub(crate) fn render_value(value: &Bson) -> String {
    match value {
        Bson::Array(items) => items
            .iter()
            .map(render_scalar)
            .collect::<Vec<_>>()
            .join(", "),
        other => render_scalar(other),
    }
}

fn render_scalar(value: &Bson) -> String {
    match value {
        Bson::String(s) => s.trim().to_string(),
        Bson::Int32(n) => n.to_string(),
        Bson::Int64(n) => n.to_string(),
        Bson::Double(n) => n.to_string(),
        Bson::Boolean(b) => b.to_string(),
        Bson::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[test]
    fn top_level_string() {
        let d = doc! { "fullplot": "  A whale does something great.  " };
        assert_eq!(
            shallow_extract(&d, "fullplot"),
            "A whale does something great."
        );
    }

    #[test]
    fn nested_path_through_subdocument() {
        let d = doc! { "data": { "activity": "running" } };
        assert_eq!(shallow_extract(&d, "data.activity"), "running");
    }

    #[test]
    fn array_hop_takes_first_element_only() {
        let d = doc! {
            "data": [
                { "activity": "first" },
                { "activity": "second" },
            ]
        };
        assert_eq!(shallow_extract(&d, "data.activity"), "first");
    }

    #[test]
    fn missing_hop_yields_empty() {
        let d = doc! { "data": { "other": 1 } };
        assert_eq!(shallow_extract(&d, "data.activity"), "");
        assert_eq!(shallow_extract(&d, "absent.deep"), "");
    }

    #[test]
    fn scalar_intermediate_yields_empty() {
        let d = doc! { "data": "not a subdocument" };
        assert_eq!(shallow_extract(&d, "data.activity"), "");
    }

    #[test]
    fn empty_intermediate_array_yields_empty() {
        let d = doc! { "data": [] };
        assert_eq!(shallow_extract(&d, "data.activity"), "");
    }

    #[test]
    fn terminal_array_is_joined() {
        let d = doc! { "comments": ["great", "weird", "long"] };
        assert_eq!(shallow_extract(&d, "comments"), "great, weird, long");
    }
}
