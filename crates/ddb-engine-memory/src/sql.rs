//! A hand-rolled interpreter for the small, closed vocabulary of `{}`/`?`
//! templates `ddb-core`'s Structure Layer ever emits: `CREATE TABLE`,
//! `INSERT INTO ... VALUES`, `UPDATE ... SET`, `DELETE FROM`, and `SELECT`
//! (including the `INTERSECT`/`UNION`/`EXCEPT` set algebra `compile_condition`
//! builds out of nested derived tables). Not a SQL engine — it recognizes
//! exactly the shapes our own template-building code produces and nothing
//! else.

use std::collections::BTreeMap;

use ddb_engine::{Row, SqlValue};

use crate::error::MemoryEngineError;

#[derive(Debug, Clone, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
}

pub type Tables = BTreeMap<String, Table>;

struct BindCursor<'a> {
    binds: &'a [SqlValue],
    pos: usize,
}

impl<'a> BindCursor<'a> {
    fn new(binds: &'a [SqlValue]) -> Self {
        BindCursor { binds, pos: 0 }
    }

    fn next(&mut self) -> Result<SqlValue, MemoryEngineError> {
        let v = self
            .binds
            .get(self.pos)
            .cloned()
            .ok_or(MemoryEngineError::BindCountMismatch)?;
        self.pos += 1;
        Ok(v)
    }

    fn next_int(&mut self) -> Result<i64, MemoryEngineError> {
        match self.next()? {
            SqlValue::Int(v) | SqlValue::Id(v) => Ok(v),
            _ => Err(MemoryEngineError::Unsupported("expected an integer bind".into())),
        }
    }
}

/// Run a statement already rendered by `ddb_sql::render_template_question_marks`
/// (table identifiers double-quoted, binds left as literal `?`).
pub fn eval(sql: &str, binds: &[SqlValue], tables: &mut Tables) -> Result<Vec<Row>, MemoryEngineError> {
    let mut cursor = BindCursor::new(binds);
    let rows = eval_statement(sql.trim(), &mut cursor, tables)?;
    Ok(rows.into_iter().map(|r| Row::new(r)).collect())
}

fn eval_statement(sql: &str, binds: &mut BindCursor, tables: &mut Tables) -> Result<Vec<Vec<SqlValue>>, MemoryEngineError> {
    if sql.starts_with("CREATE TABLE ") {
        handle_create_table(sql, tables)?;
        return Ok(Vec::new());
    }
    if sql.starts_with("INSERT INTO ") {
        handle_insert(sql, binds, tables)?;
        return Ok(Vec::new());
    }
    if sql.starts_with("UPDATE ") {
        handle_update(sql, binds, tables)?;
        return Ok(Vec::new());
    }
    if sql.starts_with("DELETE FROM ") {
        handle_delete(sql, binds, tables)?;
        return Ok(Vec::new());
    }
    if let Some(body) = sql.strip_prefix("SELECT ") {
        return eval_select(body.trim(), binds, tables);
    }
    Err(MemoryEngineError::Unsupported(sql.to_string()))
}

// ---- identifier/paren scanning -------------------------------------------

/// Parse a `"..."`-quoted identifier (doubled `""` is an escaped quote),
/// returning the unquoted name and the remainder of the string.
fn parse_ident(s: &str) -> Option<(String, &str)> {
    let rest = s.strip_prefix('"')?;
    let mut out = String::new();
    let mut iter = rest.char_indices();
    while let Some((i, c)) = iter.next() {
        if c == '"' {
            if rest[i + 1..].starts_with('"') {
                out.push('"');
                iter.next();
            } else {
                return Some((out, &rest[i + 1..]));
            }
        } else {
            out.push(c);
        }
    }
    None
}

/// Index, relative to `after_open[0]`, of the `)` that closes the `(` just
/// consumed by the caller.
fn find_close_paren(after_open: &str) -> Option<usize> {
    let mut depth = 1i32;
    for (i, c) in after_open.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn top_level_positions(s: &str, needle: &str) -> Vec<usize> {
    let mut depth = 0i32;
    let mut positions = Vec::new();
    let bytes = s.as_bytes();
    let mut i = 0usize;
    while i < s.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => depth -= 1,
            _ => {}
        }
        if depth == 0 && s[i..].starts_with(needle) {
            positions.push(i);
        }
        i += 1;
    }
    positions
}

fn find_top_level(s: &str, needle: &str) -> Option<usize> {
    top_level_positions(s, needle).into_iter().next()
}

fn split_top_level<'a>(s: &'a str, needle: &str) -> Vec<&'a str> {
    let positions = top_level_positions(s, needle);
    if positions.is_empty() {
        return vec![s];
    }
    let mut out = Vec::new();
    let mut start = 0usize;
    for pos in positions {
        out.push(&s[start..pos]);
        start = pos + needle.len();
    }
    out.push(&s[start..]);
    out
}

fn split_name_and_where(s: &str) -> Result<(String, Option<&str>), MemoryEngineError> {
    let s = s.trim();
    let (ident, rest) = parse_ident(s).ok_or_else(|| MemoryEngineError::Unsupported(format!("expected quoted table name in {s:?}")))?;
    let rest = rest.trim();
    match rest.strip_prefix("WHERE ") {
        Some(cond) => Ok((ident, Some(cond.trim()))),
        None if rest.is_empty() => Ok((ident, None)),
        None => Err(MemoryEngineError::Unsupported(format!("unexpected trailer {rest:?}"))),
    }
}

// ---- DDL / DML ------------------------------------------------------------

fn handle_create_table(sql: &str, tables: &mut Tables) -> Result<(), MemoryEngineError> {
    let rest = sql.strip_prefix("CREATE TABLE ").unwrap().trim();
    let (name, rest) = parse_ident(rest).ok_or_else(|| MemoryEngineError::Unsupported(sql.to_string()))?;
    let rest = rest.trim();
    let open = rest.find('(').ok_or_else(|| MemoryEngineError::Unsupported(sql.to_string()))?;
    let close = rest.rfind(')').ok_or_else(|| MemoryEngineError::Unsupported(sql.to_string()))?;
    let body = &rest[open + 1..close];
    let columns = body
        .split(',')
        .map(|def| {
            def.trim()
                .split_whitespace()
                .next()
                .map(|s| s.to_string())
                .ok_or_else(|| MemoryEngineError::Unsupported(format!("empty column def in {body:?}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    tables.entry(name).or_insert(Table { columns, rows: Vec::new() });
    Ok(())
}

fn handle_insert(sql: &str, binds: &mut BindCursor, tables: &mut Tables) -> Result<(), MemoryEngineError> {
    let rest = sql.strip_prefix("INSERT INTO ").unwrap().trim();
    let (name, rest) = parse_ident(rest).ok_or_else(|| MemoryEngineError::Unsupported(sql.to_string()))?;
    let rest = rest.trim().strip_prefix("VALUES ").ok_or_else(|| MemoryEngineError::Unsupported(sql.to_string()))?.trim();
    let open = rest.find('(').ok_or_else(|| MemoryEngineError::Unsupported(sql.to_string()))?;
    let close = rest.rfind(')').ok_or_else(|| MemoryEngineError::Unsupported(sql.to_string()))?;
    let mut row = Vec::new();
    for val in rest[open + 1..close].split(',') {
        let val = val.trim();
        if val == "?" {
            row.push(binds.next()?);
        } else {
            let literal = val
                .parse::<i64>()
                .map_err(|_| MemoryEngineError::Unsupported(format!("non-integer literal insert value {val:?}")))?;
            row.push(SqlValue::Int(literal));
        }
    }
    let table = tables.get_mut(&name).ok_or_else(|| MemoryEngineError::MissingTable(name.clone()))?;
    if row.len() != table.columns.len() {
        return Err(MemoryEngineError::Unsupported(format!(
            "insert into {name:?} supplied {} values for {} columns",
            row.len(),
            table.columns.len()
        )));
    }
    table.rows.push(row);
    Ok(())
}

fn handle_update(sql: &str, binds: &mut BindCursor, tables: &mut Tables) -> Result<(), MemoryEngineError> {
    let rest = sql.strip_prefix("UPDATE ").unwrap().trim();
    let (name, rest) = parse_ident(rest).ok_or_else(|| MemoryEngineError::Unsupported(sql.to_string()))?;
    let rest = rest.trim().strip_prefix("SET ").ok_or_else(|| MemoryEngineError::Unsupported(sql.to_string()))?;
    let (assigns_str, where_str) = match find_top_level(rest, " WHERE ") {
        Some(idx) => (&rest[..idx], Some(rest[idx + " WHERE ".len()..].trim())),
        None => (rest, None),
    };

    let columns = tables
        .get(&name)
        .ok_or_else(|| MemoryEngineError::MissingTable(name.clone()))?
        .columns
        .clone();

    let mut deltas: Vec<(usize, i64)> = Vec::new();
    for assign in assigns_str.split(',') {
        let assign = assign.trim();
        let (col, rhs) = assign.split_once('=').ok_or_else(|| MemoryEngineError::Unsupported(format!("bad assignment {assign:?}")))?;
        let col = col.trim();
        let col_idx = columns
            .iter()
            .position(|c| c == col)
            .ok_or_else(|| MemoryEngineError::MissingColumn(col.to_string()))?;
        let rhs = rhs.trim();
        let expr = rhs
            .strip_prefix(col)
            .ok_or_else(|| MemoryEngineError::Unsupported(format!("unsupported assignment rhs {rhs:?}")))?;
        let (sign, amount_str) = if let Some(r) = expr.strip_prefix('+') {
            (1i64, r.trim())
        } else if let Some(r) = expr.strip_prefix('-') {
            (-1i64, r.trim())
        } else {
            return Err(MemoryEngineError::Unsupported(format!("unsupported assignment rhs {rhs:?}")));
        };
        let amount = if amount_str == "?" {
            binds.next_int()?
        } else {
            amount_str
                .parse::<i64>()
                .map_err(|_| MemoryEngineError::Unsupported(format!("non-integer literal {amount_str:?}")))?
        };
        deltas.push((col_idx, sign * amount));
    }

    let cond = where_str.map(|w| parse_cond(w, &columns, binds)).transpose()?;

    let table = tables.get_mut(&name).expect("checked above");
    for row in table.rows.iter_mut() {
        let matched = match &cond {
            Some(c) => eval_cond_expr(c, row),
            None => true,
        };
        if matched {
            for (idx, delta) in &deltas {
                if let SqlValue::Int(v) | SqlValue::Id(v) = &mut row[*idx] {
                    *v += delta;
                }
            }
        }
    }
    Ok(())
}

fn handle_delete(sql: &str, binds: &mut BindCursor, tables: &mut Tables) -> Result<(), MemoryEngineError> {
    let rest = sql.strip_prefix("DELETE FROM ").unwrap().trim();
    let (name, cond_str) = split_name_and_where(rest)?;
    let columns = tables
        .get(&name)
        .ok_or_else(|| MemoryEngineError::MissingTable(name.clone()))?
        .columns
        .clone();
    let cond = cond_str.map(|w| parse_cond(w, &columns, binds)).transpose()?;
    let table = tables.get_mut(&name).expect("checked above");
    table.rows.retain(|row| match &cond {
        Some(c) => !eval_cond_expr(c, row),
        None => false,
    });
    Ok(())
}

// ---- SELECT ---------------------------------------------------------------

fn eval_select(body: &str, binds: &mut BindCursor, tables: &mut Tables) -> Result<Vec<Vec<SqlValue>>, MemoryEngineError> {
    let body = body.trim();

    for op in [" INTERSECT ", " UNION ", " EXCEPT "] {
        if let Some(idx) = find_top_level(body, op) {
            let left = body[..idx].trim();
            let right = body[idx + op.len()..].trim();
            let left_rows = eval_select(left, binds, tables)?;
            let right_rows = eval_select(strip_select(right)?, binds, tables)?;
            return Ok(combine_sets(op.trim(), left_rows, right_rows));
        }
    }

    if let Some(from_idx) = find_top_level(body, " FROM (") {
        let after_open = &body[from_idx + " FROM (".len()..];
        let close = find_close_paren(after_open).ok_or_else(|| MemoryEngineError::Unsupported(body.to_string()))?;
        let inner = after_open[..close].trim();
        return eval_select(strip_select(inner)?, binds, tables);
    }

    eval_base_select(body, binds, tables)
}

fn strip_select(s: &str) -> Result<&str, MemoryEngineError> {
    s.trim()
        .strip_prefix("SELECT ")
        .map(|r| r.trim())
        .ok_or_else(|| MemoryEngineError::Unsupported(format!("expected SELECT in {s:?}")))
}

fn combine_sets(op: &str, left: Vec<Vec<SqlValue>>, right: Vec<Vec<SqlValue>>) -> Vec<Vec<SqlValue>> {
    match op {
        "INTERSECT" => dedup_rows(left.into_iter().filter(|r| right.contains(r)).collect()),
        "UNION" => {
            let mut out = left;
            for r in right {
                if !out.contains(&r) {
                    out.push(r);
                }
            }
            dedup_rows(out)
        }
        "EXCEPT" => left.into_iter().filter(|r| !right.contains(r)).collect(),
        _ => unreachable!("only INTERSECT/UNION/EXCEPT are ever matched here"),
    }
}

fn dedup_rows(rows: Vec<Vec<SqlValue>>) -> Vec<Vec<SqlValue>> {
    let mut seen: Vec<Vec<SqlValue>> = Vec::with_capacity(rows.len());
    for row in rows {
        if !seen.contains(&row) {
            seen.push(row);
        }
    }
    seen
}

fn eval_base_select(body: &str, binds: &mut BindCursor, tables: &Tables) -> Result<Vec<Vec<SqlValue>>, MemoryEngineError> {
    if let Some(rest) = body.strip_prefix("COUNT(*) FROM ") {
        let (name, cond_str) = split_name_and_where(rest)?;
        let table = tables.get(&name).ok_or_else(|| MemoryEngineError::MissingTable(name.clone()))?;
        let cond = cond_str.map(|w| parse_cond(w, &table.columns, binds)).transpose()?;
        let count = table
            .rows
            .iter()
            .filter(|row| match &cond {
                Some(c) => eval_cond_expr(c, row),
                None => true,
            })
            .count();
        return Ok(vec![vec![SqlValue::Int(count as i64)]]);
    }

    if let Some(rest) = body.strip_prefix("MAX(") {
        let close = rest.find(')').ok_or_else(|| MemoryEngineError::Unsupported(body.to_string()))?;
        let col = rest[..close].trim().to_string();
        let after = rest[close + 1..].trim().strip_prefix("FROM ").ok_or_else(|| MemoryEngineError::Unsupported(body.to_string()))?;
        let (name, cond_str) = split_name_and_where(after)?;
        let table = tables.get(&name).ok_or_else(|| MemoryEngineError::MissingTable(name.clone()))?;
        let col_idx = table
            .columns
            .iter()
            .position(|c| *c == col)
            .ok_or_else(|| MemoryEngineError::MissingColumn(col.clone()))?;
        let cond = cond_str.map(|w| parse_cond(w, &table.columns, binds)).transpose()?;
        let max = table
            .rows
            .iter()
            .filter(|row| match &cond {
                Some(c) => eval_cond_expr(c, row),
                None => true,
            })
            .filter_map(|row| match &row[col_idx] {
                SqlValue::Int(v) | SqlValue::Id(v) => Some(*v),
                _ => None,
            })
            .max();
        return Ok(vec![vec![max.map(SqlValue::Int).unwrap_or(SqlValue::Null)]]);
    }

    let (distinct, rest) = match body.strip_prefix("DISTINCT ") {
        Some(r) => (true, r),
        None => (false, body),
    };
    let (cols_str, rest) = rest
        .split_once(" FROM ")
        .ok_or_else(|| MemoryEngineError::Unsupported(body.to_string()))?;
    let cols: Vec<String> = cols_str.split(',').map(|c| c.trim().to_string()).collect();
    let (name, cond_str) = split_name_and_where(rest)?;
    let table = tables.get(&name).ok_or_else(|| MemoryEngineError::MissingTable(name.clone()))?;
    let col_idxs = cols
        .iter()
        .map(|c| table.columns.iter().position(|tc| tc == c).ok_or_else(|| MemoryEngineError::MissingColumn(c.clone())))
        .collect::<Result<Vec<_>, _>>()?;
    let cond = cond_str.map(|w| parse_cond(w, &table.columns, binds)).transpose()?;

    let mut out: Vec<Vec<SqlValue>> = table
        .rows
        .iter()
        .filter(|row| match &cond {
            Some(c) => eval_cond_expr(c, row),
            None => true,
        })
        .map(|row| col_idxs.iter().map(|&i| row[i].clone()).collect())
        .collect();
    if distinct {
        out = dedup_rows(out);
    }
    Ok(out)
}

// ---- WHERE-clause condition trees -----------------------------------------

enum CondExpr {
    And(Vec<CondExpr>),
    Or(Vec<CondExpr>),
    Not(Box<CondExpr>),
    Cmp { col_idx: usize, op: &'static str, value: SqlValue },
}

fn parse_cond(s: &str, columns: &[String], binds: &mut BindCursor) -> Result<CondExpr, MemoryEngineError> {
    let s = s.trim();
    let or_parts = split_top_level(s, " OR ");
    if or_parts.len() > 1 {
        let parts = or_parts
            .into_iter()
            .map(|p| parse_and(p.trim(), columns, binds))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(CondExpr::Or(parts));
    }
    parse_and(s, columns, binds)
}

fn parse_and(s: &str, columns: &[String], binds: &mut BindCursor) -> Result<CondExpr, MemoryEngineError> {
    let parts = split_top_level(s, " AND ");
    if parts.len() > 1 {
        let out = parts
            .into_iter()
            .map(|p| parse_maybe_not(p.trim(), columns, binds))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(CondExpr::And(out));
    }
    parse_maybe_not(s, columns, binds)
}

/// `compile_condition` renders an inverted leaf as `WHERE NOT value = ?...`;
/// this is the only place `NOT` appears in our own templates.
fn parse_maybe_not(s: &str, columns: &[String], binds: &mut BindCursor) -> Result<CondExpr, MemoryEngineError> {
    match s.strip_prefix("NOT ") {
        Some(rest) => Ok(CondExpr::Not(Box::new(parse_atom(rest.trim(), columns, binds)?))),
        None => parse_atom(s, columns, binds),
    }
}

const COMPARISON_TOKENS: &[(&str, &str)] = &[("REGEXP", " REGEXP "), (">=", ">="), ("<=", "<="), ("=", "="), (">", ">"), ("<", "<")];

fn parse_atom(s: &str, columns: &[String], binds: &mut BindCursor) -> Result<CondExpr, MemoryEngineError> {
    if let Some(inner) = s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        return parse_cond(inner, columns, binds);
    }
    for (op, token) in COMPARISON_TOKENS {
        let Some(idx) = s.find(token) else { continue };
        let col = s[..idx].trim();
        let rhs = s[idx + token.len()..].trim();
        if rhs != "?" {
            continue;
        }
        let col_idx = columns
            .iter()
            .position(|c| c == col)
            .ok_or_else(|| MemoryEngineError::MissingColumn(col.to_string()))?;
        let value = binds.next()?;
        return Ok(CondExpr::Cmp { col_idx, op, value });
    }
    Err(MemoryEngineError::Unsupported(format!("condition atom {s:?}")))
}

fn eval_cond_expr(expr: &CondExpr, row: &[SqlValue]) -> bool {
    match expr {
        CondExpr::And(parts) => parts.iter().all(|p| eval_cond_expr(p, row)),
        CondExpr::Or(parts) => parts.iter().any(|p| eval_cond_expr(p, row)),
        CondExpr::Not(inner) => !eval_cond_expr(inner, row),
        CondExpr::Cmp { col_idx, op, value } => compare(&row[*col_idx], op, value),
    }
}

fn compare(cell: &SqlValue, op: &str, bind: &SqlValue) -> bool {
    if op == "REGEXP" {
        return match (cell, bind) {
            (SqlValue::Str(text), SqlValue::Str(pattern)) => regex::Regex::new(pattern).map(|re| re.is_match(text)).unwrap_or(false),
            _ => false,
        };
    }
    let ord = match (cell, bind) {
        (SqlValue::Int(a), SqlValue::Int(b))
        | (SqlValue::Id(a), SqlValue::Int(b))
        | (SqlValue::Int(a), SqlValue::Id(b))
        | (SqlValue::Id(a), SqlValue::Id(b)) => a.partial_cmp(b),
        (SqlValue::Float(a), SqlValue::Float(b)) => a.partial_cmp(b),
        (SqlValue::Str(a), SqlValue::Str(b)) => a.partial_cmp(b),
        (SqlValue::Bytes(a), SqlValue::Bytes(b)) => a.partial_cmp(b),
        (SqlValue::Null, SqlValue::Null) => Some(std::cmp::Ordering::Equal),
        _ => None,
    };
    match (op, ord) {
        ("=", Some(std::cmp::Ordering::Equal)) => true,
        (">=", Some(std::cmp::Ordering::Equal | std::cmp::Ordering::Greater)) => true,
        ("<=", Some(std::cmp::Ordering::Equal | std::cmp::Ordering::Less)) => true,
        (">", Some(std::cmp::Ordering::Greater)) => true,
        ("<", Some(std::cmp::Ordering::Less)) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(sql: &str, binds: &[SqlValue], tables: &mut Tables) -> Vec<Vec<SqlValue>> {
        eval(sql, binds, tables).unwrap().into_iter().map(|r| r.0).collect()
    }

    #[test]
    fn create_insert_select_roundtrip() {
        let mut tables = Tables::new();
        run(r#"CREATE TABLE "id_table" (id INTEGER, field TEXT, type TEXT, refcount INTEGER)"#, &[], &mut tables);
        run(
            r#"INSERT INTO "id_table" VALUES (?, ?, ?, ?)"#,
            &[SqlValue::Id(1), SqlValue::Str("name".into()), SqlValue::Str("str".into()), SqlValue::Int(1)],
            &mut tables,
        );
        let rows = run(r#"SELECT type FROM "id_table" WHERE id=? AND field=?"#, &[SqlValue::Id(1), SqlValue::Str("name".into())], &mut tables);
        assert_eq!(rows, vec![vec![SqlValue::Str("str".into())]]);
    }

    #[test]
    fn update_increments_matching_rows_only() {
        let mut tables = Tables::new();
        run(r#"CREATE TABLE "id_table" (id INTEGER, field TEXT, type TEXT, refcount INTEGER)"#, &[], &mut tables);
        run(
            r#"INSERT INTO "id_table" VALUES (?, ?, ?, ?)"#,
            &[SqlValue::Id(1), SqlValue::Str("a".into()), SqlValue::Str("str".into()), SqlValue::Int(1)],
            &mut tables,
        );
        run(
            r#"UPDATE "id_table" SET refcount=refcount+1 WHERE id=? AND field=? AND type=?"#,
            &[SqlValue::Id(1), SqlValue::Str("a".into()), SqlValue::Str("str".into())],
            &mut tables,
        );
        let rows = run(r#"SELECT refcount FROM "id_table" WHERE id=? AND field=?"#, &[SqlValue::Id(1), SqlValue::Str("a".into())], &mut tables);
        assert_eq!(rows, vec![vec![SqlValue::Int(2)]]);
    }

    #[test]
    fn intersect_union_except_combine_id_sets() {
        let mut tables = Tables::new();
        run(r#"CREATE TABLE "a" (id INTEGER)"#, &[], &mut tables);
        run(r#"CREATE TABLE "b" (id INTEGER)"#, &[], &mut tables);
        for id in [1, 2, 3] {
            run(r#"INSERT INTO "a" VALUES (?)"#, &[SqlValue::Id(id)], &mut tables);
        }
        for id in [2, 3, 4] {
            run(r#"INSERT INTO "b" VALUES (?)"#, &[SqlValue::Id(id)], &mut tables);
        }

        let mut intersection = run(r#"SELECT * FROM (SELECT id FROM "a") as left_q INTERSECT SELECT * FROM (SELECT id FROM "b") as right_q"#, &[], &mut tables);
        intersection.sort_by_key(|r| r[0].clone().unwrap_int());
        assert_eq!(intersection, vec![vec![SqlValue::Id(2)], vec![SqlValue::Id(3)]]);

        let mut union = run(r#"SELECT * FROM (SELECT id FROM "a") as left_q UNION SELECT * FROM (SELECT id FROM "b") as right_q"#, &[], &mut tables);
        union.sort_by_key(|r| r[0].clone().unwrap_int());
        assert_eq!(union, vec![vec![SqlValue::Id(1)], vec![SqlValue::Id(2)], vec![SqlValue::Id(3)], vec![SqlValue::Id(4)]]);

        let except = run(r#"SELECT id FROM (SELECT id FROM "a" EXCEPT SELECT id FROM "b") as absent"#, &[], &mut tables);
        assert_eq!(except, vec![vec![SqlValue::Id(1)]]);
    }

    #[test]
    fn regexp_atom_matches_field_names() {
        let mut tables = Tables::new();
        run(r#"CREATE TABLE "id_table" (id INTEGER, field TEXT, type TEXT, refcount INTEGER)"#, &[], &mut tables);
        for field in ["tracks..0..title", "tracks..1..title", "album"] {
            run(
                r#"INSERT INTO "id_table" VALUES (?, ?, ?, ?)"#,
                &[SqlValue::Id(1), SqlValue::Str(field.into()), SqlValue::Str("str".into()), SqlValue::Int(1)],
                &mut tables,
            );
        }
        let rows = run(
            r#"SELECT DISTINCT field FROM "id_table" WHERE id=? AND field REGEXP ?"#,
            &[SqlValue::Id(1), SqlValue::Str("^tracks\\.\\.".into())],
            &mut tables,
        );
        assert_eq!(rows.len(), 2);
    }
}

#[cfg(test)]
trait UnwrapInt {
    fn unwrap_int(self) -> i64;
}

#[cfg(test)]
impl UnwrapInt for SqlValue {
    fn unwrap_int(self) -> i64 {
        match self {
            SqlValue::Id(v) | SqlValue::Int(v) => v,
            other => panic!("expected an integer SqlValue, got {other:?}"),
        }
    }
}
