//! Identifier/literal quoting and `{}`/`?` template rendering.
//!
//! The core (`ddb-core`) never depends on this crate: per the adapter
//! contract, the Structure Layer builds SQL *templates* with `{}` for table
//! identifiers and `?` for bound values, and it is the adapter's job to quote
//! identifiers and number placeholders. This crate is shared plumbing for the
//! engine adapters that ship in this repository (`ddb-engine-memory`,
//! `ddb-postgres`) so they don't each reinvent quoting.

use std::fmt;

/// A SQL string literal wrapper.
///
/// Display writes the value escaped and single-quoted.
///
/// ```
/// use ddb_sql::Lit;
/// assert_eq!(format!("{}", Lit("foo")), "'foo'");
/// assert_eq!(format!("{}", Lit("it's")), "'it''s'");
/// ```
pub struct Lit<T: AsRef<str>>(pub T);

impl<T: AsRef<str>> fmt::Display for Lit<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'")?;
        for c in self.0.as_ref().chars() {
            if c == '\'' {
                write!(f, "''")?;
            } else {
                write!(f, "{c}")?;
            }
        }
        write!(f, "'")
    }
}

/// A SQL identifier wrapper.
///
/// Display writes the value escaped and double-quoted.
///
/// ```
/// use ddb_sql::Ident;
/// assert_eq!(format!("{}", Ident("user")), "\"user\"");
/// assert_eq!(format!("{}", Ident("bla\"h")), "\"bla\"\"h\"");
/// ```
pub struct Ident<T: AsRef<str>>(pub T);

impl<T: AsRef<str>> fmt::Display for Ident<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"")?;
        for c in self.0.as_ref().chars() {
            if c == '"' {
                write!(f, "\"\"")?;
            } else {
                write!(f, "{c}")?;
            }
        }
        write!(f, "\"")
    }
}

/// Escape a string literal for SQL.
pub fn escape_string(s: &str) -> String {
    format!("{}", Lit(s))
}

/// Quote a SQL identifier.
///
/// Always quotes, so that field-table names derived from arbitrary document
/// keys never collide with reserved words.
pub fn quote_ident(name: &str) -> String {
    format!("{}", Ident(name))
}

/// The result of rendering a `{}`/`?` template against a backend's
/// placeholder syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedSql {
    /// Final SQL text, with `{}` replaced by quoted identifiers and `?`
    /// replaced by the backend's positional placeholder syntax.
    pub sql: String,
    /// Number of `?` placeholders that were substituted.
    pub param_count: usize,
}

/// Render a `{}`/`?` SQL template.
///
/// `tables` fills each `{}` slot, in order, quoted as an identifier.
/// Each `?` is replaced by calling `placeholder(i)` where `i` is the
/// placeholder's 1-based position — e.g. Postgres wants `$1`, `$2`, ...;
/// a backend that accepts literal `?` can just return `"?".to_string()`.
///
/// Panics if the template references more `{}` slots than `tables` has
/// entries — this is a programming error in the Structure Layer, not a
/// runtime condition callers should handle.
pub fn render_template(
    template: &str,
    tables: &[impl AsRef<str>],
    placeholder: impl Fn(usize) -> String,
) -> RenderedSql {
    let mut out = String::with_capacity(template.len() + 16);
    let mut table_idx = 0;
    let mut param_idx = 0;
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'}') => {
                chars.next();
                let table = tables
                    .get(table_idx)
                    .unwrap_or_else(|| panic!("template references table slot {table_idx} but only {} were given", tables.len()));
                out.push_str(&quote_ident(table.as_ref()));
                table_idx += 1;
            }
            '?' => {
                param_idx += 1;
                out.push_str(&placeholder(param_idx));
            }
            other => out.push(other),
        }
    }

    RenderedSql {
        sql: out,
        param_count: param_idx,
    }
}

/// Render a template using Postgres-style `$1, $2, ...` placeholders.
pub fn render_template_numbered(template: &str, tables: &[impl AsRef<str>]) -> RenderedSql {
    render_template(template, tables, |i| format!("${i}"))
}

/// Render a template using literal `?` placeholders (e.g. sqlite-style
/// backends, or the in-memory reference engine's own pattern matcher, which
/// doesn't care about placeholder syntax at all but keeps this for symmetry).
pub fn render_template_question_marks(template: &str, tables: &[impl AsRef<str>]) -> RenderedSql {
    render_template(template, tables, |_| "?".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_and_escapes() {
        assert_eq!(quote_ident("tracks..int"), "\"tracks..int\"");
        assert_eq!(escape_string("Track 1"), "'Track 1'");
        assert_eq!(escape_string("it's"), "'it''s'");
    }

    #[test]
    fn renders_tables_and_numbered_params() {
        let rendered = render_template_numbered(
            "SELECT DISTINCT id FROM {} WHERE value = ? AND c0 = ?",
            &["tracks..int"],
        );
        assert_eq!(
            rendered.sql,
            "SELECT DISTINCT id FROM \"tracks..int\" WHERE value = $1 AND c0 = $2"
        );
        assert_eq!(rendered.param_count, 2);
    }

    #[test]
    fn renders_multiple_tables_in_order() {
        let rendered = render_template_question_marks(
            "SELECT id FROM {} EXCEPT SELECT id FROM {}",
            &["id_table", "tracks..int"],
        );
        assert_eq!(
            rendered.sql,
            "SELECT id FROM \"id_table\" EXCEPT SELECT id FROM \"tracks..int\""
        );
        assert_eq!(rendered.param_count, 0);
    }

    #[test]
    #[should_panic(expected = "only 1 were given")]
    fn panics_on_missing_table_slot() {
        render_template_numbered("SELECT * FROM {} JOIN {}", &["only_one"]);
    }
}
