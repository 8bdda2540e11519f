//! Recognising uniqueness rejections in engine error messages.
//!
//! DuckDB reports them as
//! `Constraint Error: Duplicate key "col: value" violates unique constraint.`
//! with one `col: value` pair per key column, comma separated.

use std::collections::BTreeSet;

const DUPLICATE_KEY_MARKER: &str = "Duplicate key \"";
const VIOLATES_MARKER: &str = "\" violates ";

/// Extract the violated columns from a duplicate-key message.
///
/// Returns `None` when the message is not a uniqueness rejection. Returns
/// an empty set when it is one but no column names could be recovered.
pub fn duplicate_key_fields(message: &str) -> Option<BTreeSet<String>> {
    let start = message.find(DUPLICATE_KEY_MARKER)? + DUPLICATE_KEY_MARKER.len();
    let rest = &message[start..];
    let end = rest.rfind(VIOLATES_MARKER)?;
    let (target, tail) = rest.split_at(end);

    let tail = &tail[VIOLATES_MARKER.len()..];
    if !(tail.starts_with("unique constraint") || tail.starts_with("primary key constraint")) {
        return None;
    }

    // Values are not escaped, so a value containing `, name: ` also yields
    // `name`. Real columns are never dropped, only extra ones added.
    let fields = target
        .split(", ")
        .filter_map(|pair| pair.split_once(": "))
        .map(|(column, _)| column.trim())
        .filter(|column| is_identifier(column))
        .map(str::to_owned)
        .collect();
    Some(fields)
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(message: &str) -> Vec<String> {
        duplicate_key_fields(message)
            .expect("expected a duplicate key message")
            .into_iter()
            .collect()
    }

    #[test]
    fn single_column_unique() {
        let msg = "Constraint Error: Duplicate key \"idempotency_key: k1\" violates unique \
                   constraint. If this is an unexpected constraint violation please double check \
                   with the known index limitations section in our documentation.";
        assert_eq!(fields(msg), ["idempotency_key"]);
    }

    #[test]
    fn primary_key() {
        let msg = "Constraint Error: Duplicate key \"id: 6f1c1f0e-2a4b-4a8e-9a43-0b4f6c2b9d11\" \
                   violates primary key constraint.";
        assert_eq!(fields(msg), ["id"]);
    }

    #[test]
    fn composite_key() {
        let msg = "Constraint Error: Duplicate key \"tenant: acme, idempotencyKey: k1\" \
                   violates unique constraint.";
        assert_eq!(fields(msg), ["idempotencyKey", "tenant"]);
    }

    #[test]
    fn value_containing_quotes_and_separators() {
        let msg = "Constraint Error: Duplicate key \"idempotency_key: a\" violates , b\" \
                   violates unique constraint.";
        assert_eq!(fields(msg), ["idempotency_key"]);
    }

    #[test]
    fn separator_inside_value_adds_but_never_drops_columns() {
        let msg = "Constraint Error: Duplicate key \"idempotency_key: a, id: b\" violates unique \
                   constraint.";
        let columns = fields(msg);
        assert!(columns.contains(&"idempotency_key".to_string()));
        assert_eq!(columns, ["id", "idempotency_key"]);
    }

    #[test]
    fn unnamed_columns_yield_empty_set() {
        let msg = "Constraint Error: Duplicate key \"k1\" violates unique constraint.";
        assert!(duplicate_key_fields(msg).unwrap().is_empty());
    }

    #[test]
    fn not_null_is_not_a_duplicate() {
        let msg = "Constraint Error: NOT NULL constraint failed: raw_captures.payload";
        assert!(duplicate_key_fields(msg).is_none());
    }

    #[test]
    fn foreign_key_is_not_a_duplicate() {
        let msg = "Constraint Error: Duplicate key \"id: 1\" violates foreign key constraint.";
        assert!(duplicate_key_fields(msg).is_none());
    }

    #[test]
    fn catalog_error_is_not_a_duplicate() {
        let msg = "Catalog Error: Table with name leads does not exist!";
        assert!(duplicate_key_fields(msg).is_none());
    }
}
