//! Per-field table column layout: `(id, value, c0, c1, ...)`, one `ci` per
//! integer-index segment (concrete or wildcard) of the field's path, in
//! order of occurrence.

use ddb_engine::SqlValue;
use ddb_proto::{Path, PathSegment};

pub fn column_name(position: usize) -> String {
    format!("c{position}")
}

/// Column definitions for `CREATE TABLE`, e.g. `", c0 INT, c1 INT"`.
pub fn column_defs(path: &Path, int_type: &str) -> String {
    (0..path.index_column_count())
        .map(|i| format!(", {} {int_type}", column_name(i)))
        .collect()
}

/// `", c0, c1, ..."` selecting every integer-index column, for reads that
/// need to recover concrete indices alongside the value.
pub fn select_clause(path: &Path) -> String {
    (0..path.index_column_count())
        .map(|i| format!(", {}", column_name(i)))
        .collect()
}

/// WHERE-clause fragment and bound values constraining every *concrete*
/// integer segment of `path`; wildcard segments are left unconstrained so
/// they match any stored index.
pub fn where_clause(path: &Path) -> (String, Vec<SqlValue>) {
    let mut clause = String::new();
    let mut binds = Vec::new();
    let mut column = 0usize;
    for segment in path.segments() {
        match segment {
            PathSegment::Index(index) => {
                clause.push_str(&format!(" AND {} = ?", column_name(column)));
                binds.push(SqlValue::Int(*index as i64));
                column += 1;
            }
            PathSegment::Wildcard => column += 1,
            PathSegment::Key(_) => {}
        }
    }
    (clause, binds)
}

/// The column holding a list's own element index: the first integer column
/// after `list_path`'s own index columns. Any child field rooted at
/// `list_path` shares this column layout by construction (child tables are
/// named from a path that extends `list_path`).
pub fn list_element_column(list_path: &Path) -> usize {
    list_path.index_column_count()
}

/// Escape a string for use inside the query's regexp operand (`^` / `$` /
/// `..` handling is the caller's job; this only escapes regex metacharacters
/// that could appear in a map key).
pub fn regex_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if "\\.+*?()|[]{}^$".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddb_proto::PathSegment;

    fn p(segments: Vec<PathSegment>) -> Path {
        Path::new(segments).unwrap()
    }

    #[test]
    fn where_clause_binds_only_concrete_indices() {
        let path = p(vec![
            PathSegment::Key("tracks".into()),
            PathSegment::Index(2),
            PathSegment::Key("lyrics".into()),
            PathSegment::Wildcard,
        ]);
        let (clause, binds) = where_clause(&path);
        assert_eq!(clause, " AND c0 = ?");
        assert_eq!(binds, vec![SqlValue::Int(2)]);
    }

    #[test]
    fn list_element_column_is_first_index_after_prefix() {
        let list_path = p(vec![PathSegment::Key("tracks".into())]);
        assert_eq!(list_element_column(&list_path), 0);

        let nested = p(vec![PathSegment::Key("albums".into()), PathSegment::Index(0), PathSegment::Key("tracks".into())]);
        assert_eq!(list_element_column(&nested), 1);
    }
}
