//! Owns the specification table (`id_table`) and every per-field table:
//! refcount maintenance, field-table lifecycle, typed value read/write,
//! list-index renumbering, mask-based field enumeration, and the
//! condition-to-set-query compiler.

use std::collections::HashMap;

use ddb_engine::{Engine, Row, SqlValue};
use ddb_proto::{Comparator, Condition, LogicalOp, Path, PathSegment, TypeTag, Value};
use tracing::Instrument;

use crate::columns;
use crate::error::Error;

const ID_COLUMN: &str = "id";
const FIELD_COLUMN: &str = "field";
const TYPE_COLUMN: &str = "type";
const REFCOUNT_COLUMN: &str = "refcount";
const VALUE_COLUMN: &str = "value";

/// A compiled, adapter-agnostic query: `{}`-templated SQL plus the tables
/// that fill those slots (in order) and the bound values.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub template: String,
    pub tables: Vec<String>,
    pub binds: Vec<SqlValue>,
}

pub struct Structure<'e, E: Engine> {
    engine: &'e mut E,
    id_table: String,
    id_type: &'static str,
    text_type: &'static str,
    int_type: &'static str,
    float_type: &'static str,
    bytes_type: &'static str,
}

impl<'e, E: Engine> Structure<'e, E> {
    pub async fn new(engine: &'e mut E) -> Result<Self, Error> {
        let id_table = engine.get_name_string(&Path::single("id").expect("\"id\" is a valid key"));
        let id_type = engine.get_id_type();
        let text_type = engine.get_column_type(&Value::Str(String::new()));
        let int_type = engine.get_column_type(&Value::Int(0));
        let float_type = engine.get_column_type(&Value::Float(0.0));
        let bytes_type = engine.get_column_type(&Value::Bytes(Vec::new()));

        let mut structure = Structure {
            engine,
            id_table,
            id_type,
            text_type,
            int_type,
            float_type,
            bytes_type,
        };
        structure.engine.begin().await.map_err(Error::engine)?;
        structure.create_support_tables().await?;
        structure.engine.commit().await.map_err(Error::engine)?;
        Ok(structure)
    }

    async fn create_support_tables(&mut self) -> Result<(), Error> {
        if !self
            .engine
            .table_exists(&self.id_table)
            .await
            .map_err(Error::engine)?
        {
            let spec = format!(
                "({ID_COLUMN} {}, {FIELD_COLUMN} {}, {TYPE_COLUMN} {}, {REFCOUNT_COLUMN} {})",
                self.id_type, self.text_type, self.text_type, self.int_type,
            );
            let span = tracing::debug_span!("structure.create_support_tables", table = %self.id_table);
            self.engine
                .execute(&format!("CREATE TABLE {{}} {spec}"), &[&self.id_table], &[])
                .instrument(span)
                .await
                .map_err(Error::engine)?;
        }
        Ok(())
    }

    /// Recreate `id_table` by scanning every per-field table and counting
    /// rows per `(id, name_str_no_type, type)`.
    pub async fn repair_support_tables(&mut self) -> Result<(), Error> {
        self.engine
            .delete_table(&self.id_table)
            .await
            .map_err(Error::engine)?;
        self.create_support_tables().await?;

        let mut tables = self.engine.get_tables_list().await.map_err(Error::engine)?;
        tables.retain(|t| *t != self.id_table);

        let mut refcounters: HashMap<(i64, String, TypeTag), i64> = HashMap::new();
        for table in &tables {
            let Some((name_path, type_tag)) = Path::decode_name_str(table) else {
                continue;
            };
            let rows = self
                .engine
                .execute("SELECT id FROM {}", &[table.as_str()], &[])
                .await
                .map_err(Error::engine)?;
            for row in &rows {
                if let Some(id) = row.get_i64(0) {
                    *refcounters
                        .entry((id, name_path.encode_no_type(), type_tag))
                        .or_insert(0) += 1;
                }
            }
        }

        for ((id, name, type_tag), count) in refcounters {
            self.engine
                .execute(
                    "INSERT INTO {} VALUES (?, ?, ?, ?)",
                    &[&self.id_table],
                    &[
                        SqlValue::Id(id),
                        SqlValue::Str(name),
                        SqlValue::Str(type_tag.as_str().to_string()),
                        SqlValue::Int(count),
                    ],
                )
                .await
                .map_err(Error::engine)?;
        }
        Ok(())
    }

    pub async fn get_new_id(&mut self) -> Result<i64, Error> {
        self.engine.get_new_id().await.map_err(Error::engine)
    }

    pub async fn begin(&mut self) -> Result<(), Error> {
        self.engine.begin().await.map_err(Error::engine)
    }

    pub async fn commit(&mut self) -> Result<(), Error> {
        self.engine.commit().await.map_err(Error::engine)
    }

    pub async fn rollback(&mut self) -> Result<(), Error> {
        self.engine.rollback().await.map_err(Error::engine)
    }

    pub async fn delete_specification(&mut self, id: i64) -> Result<(), Error> {
        self.engine
            .execute(
                &format!("DELETE FROM {{}} WHERE {ID_COLUMN}=?"),
                &[&self.id_table],
                &[SqlValue::Id(id)],
            )
            .await
            .map_err(Error::engine)?;
        Ok(())
    }

    pub async fn object_exists(&mut self, id: i64) -> Result<bool, Error> {
        let rows = self
            .engine
            .execute(
                &format!("SELECT COUNT(*) FROM {{}} WHERE {ID_COLUMN}=?"),
                &[&self.id_table],
                &[SqlValue::Id(id)],
            )
            .await
            .map_err(Error::engine)?;
        Ok(rows.first().and_then(|r| r.get_i64(0)).unwrap_or(0) > 0)
    }

    pub async fn get_value_types(&mut self, id: i64, path: &Path) -> Result<Vec<TypeTag>, Error> {
        let name = path.encode_no_type();
        let span = tracing::debug_span!("structure.get_value_types", field = %name);
        let rows = self
            .engine
            .execute(
                &format!("SELECT {TYPE_COLUMN} FROM {{}} WHERE {ID_COLUMN}=? AND {FIELD_COLUMN}=?"),
                &[&self.id_table],
                &[SqlValue::Id(id), SqlValue::Str(name)],
            )
            .instrument(span)
            .await
            .map_err(Error::engine)?;
        Ok(rows
            .iter()
            .filter_map(|r| r.get_str(0).and_then(TypeTag::parse))
            .collect())
    }

    pub async fn increase_refcount(&mut self, id: i64, path: &Path, type_tag: TypeTag) -> Result<(), Error> {
        let name = path.encode_no_type();
        let existing = self.get_value_types(id, path).await?;
        if existing.contains(&type_tag) {
            self.engine
                .execute(
                    &format!(
                        "UPDATE {{}} SET {REFCOUNT_COLUMN}={REFCOUNT_COLUMN}+1 WHERE {ID_COLUMN}=? AND {FIELD_COLUMN}=? AND {TYPE_COLUMN}=?"
                    ),
                    &[&self.id_table],
                    &[SqlValue::Id(id), SqlValue::Str(name), SqlValue::Str(type_tag.as_str().to_string())],
                )
                .await
                .map_err(Error::engine)?;
        } else {
            self.engine
                .execute(
                    "INSERT INTO {} VALUES (?, ?, ?, 1)",
                    &[&self.id_table],
                    &[SqlValue::Id(id), SqlValue::Str(name), SqlValue::Str(type_tag.as_str().to_string())],
                )
                .await
                .map_err(Error::engine)?;
        }
        Ok(())
    }

    pub async fn decrease_refcount(
        &mut self,
        id: i64,
        path: &Path,
        type_tag: TypeTag,
        num: i64,
    ) -> Result<(), Error> {
        let name = path.encode_no_type();
        let rows = self
            .engine
            .execute(
                &format!(
                    "SELECT {REFCOUNT_COLUMN} FROM {{}} WHERE {ID_COLUMN}=? AND {FIELD_COLUMN}=? AND {TYPE_COLUMN}=?"
                ),
                &[&self.id_table],
                &[SqlValue::Id(id), SqlValue::Str(name.clone()), SqlValue::Str(type_tag.as_str().to_string())],
            )
            .await
            .map_err(Error::engine)?;
        let current = rows.first().and_then(|r| r.get_i64(0)).unwrap_or(0);

        if current == num {
            self.engine
                .execute(
                    &format!("DELETE FROM {{}} WHERE {ID_COLUMN}=? AND {FIELD_COLUMN}=? AND {TYPE_COLUMN}=?"),
                    &[&self.id_table],
                    &[SqlValue::Id(id), SqlValue::Str(name), SqlValue::Str(type_tag.as_str().to_string())],
                )
                .await
                .map_err(Error::engine)?;
        } else {
            self.engine
                .execute(
                    &format!(
                        "UPDATE {{}} SET {REFCOUNT_COLUMN}={REFCOUNT_COLUMN}-? WHERE {ID_COLUMN}=? AND {FIELD_COLUMN}=? AND {TYPE_COLUMN}=?"
                    ),
                    &[&self.id_table],
                    &[SqlValue::Int(num), SqlValue::Id(id), SqlValue::Str(name), SqlValue::Str(type_tag.as_str().to_string())],
                )
                .await
                .map_err(Error::engine)?;
        }
        Ok(())
    }

    /// Fields whose `name_str_no_type` starts with `prefix`'s (plus `prefix`
    /// itself unless `exclude_self`). With no prefix, every field of `id`.
    pub async fn get_fields_list(
        &mut self,
        id: i64,
        prefix: Option<&Path>,
        exclude_self: bool,
    ) -> Result<Vec<Path>, Error> {
        let mut binds = vec![SqlValue::Id(id)];
        let cond = match prefix {
            Some(p) => {
                let escaped = columns::regex_escape(&p.encode_no_type());
                binds.push(SqlValue::Str(format!("^{escaped}\\.\\.")));
                format!(" AND {FIELD_COLUMN} {} ?", self.engine.get_regexp_op())
            }
            None => String::new(),
        };

        let rows = self
            .engine
            .execute(
                &format!("SELECT DISTINCT {FIELD_COLUMN} FROM {{}} WHERE {ID_COLUMN}=?{cond}"),
                &[&self.id_table],
                &binds,
            )
            .await
            .map_err(Error::engine)?;

        let mut result: Vec<Path> = rows
            .iter()
            .filter_map(|r| r.get_str(0).map(Path::from_name_str_no_type))
            .collect();

        if let Some(p) = prefix {
            // Restore the prefix's own (possibly concrete) segments, which
            // `name_str_no_type` round-tripping erased into wildcards.
            let prefix_segments = p.segments();
            result = result
                .into_iter()
                .map(|decoded| {
                    let mut segs = decoded.segments().to_vec();
                    for (i, seg) in prefix_segments.iter().enumerate() {
                        if i < segs.len() {
                            segs[i] = seg.clone();
                        }
                    }
                    Path::new(segs).expect("reassembled from already-valid segments")
                })
                .collect();
            if !exclude_self {
                result.push(p.clone());
            }
        }
        Ok(result)
    }

    async fn get_raw_fields_info(
        &mut self,
        id: i64,
        masks: Option<&[Path]>,
    ) -> Result<Vec<(Path, Vec<TypeTag>)>, Error> {
        let mut binds = vec![SqlValue::Id(id)];
        let cond = match masks {
            Some(masks) if !masks.is_empty() => {
                let mut parts = Vec::new();
                for mask in masks {
                    let escaped = columns::regex_escape(&mask.encode_no_type());
                    parts.push(format!("{FIELD_COLUMN} {} ?", self.engine.get_regexp_op()));
                    binds.push(SqlValue::Str(format!("^{escaped}(\\.\\.|$)")));
                }
                format!(" AND ({})", parts.join(" OR "))
            }
            _ => String::new(),
        };

        let rows = self
            .engine
            .execute(
                &format!("SELECT {FIELD_COLUMN}, {TYPE_COLUMN} FROM {{}} WHERE {ID_COLUMN}=?{cond}"),
                &[&self.id_table],
                &binds,
            )
            .await
            .map_err(Error::engine)?;

        let mut raw: Vec<(String, Vec<TypeTag>)> = Vec::new();
        for row in &rows {
            let Some(name) = row.get_str(0) else { continue };
            let Some(type_tag) = row.get_str(1).and_then(TypeTag::parse) else {
                continue;
            };
            match raw.iter_mut().find(|(n, _)| n == name) {
                Some(entry) => entry.1.push(type_tag),
                None => raw.push((name.to_string(), vec![type_tag])),
            }
        }

        Ok(raw
            .into_iter()
            .map(|(name, types)| (Path::from_name_str_no_type(&name), types))
            .collect())
    }

    /// Concrete `(path, type)` pairs matching at least one mask (or every
    /// field, if `masks` is `None`), with masks' own segments overlaid onto
    /// the matched shape so concrete indices the mask supplied are kept.
    pub async fn get_fields_info(
        &mut self,
        id: i64,
        masks: Option<&[Path]>,
    ) -> Result<Vec<(Path, TypeTag)>, Error> {
        let raw = self.get_raw_fields_info(id, masks).await?;
        let mut result = Vec::new();

        match masks {
            None => {
                for (path, types) in raw {
                    for type_tag in types {
                        result.push((path.clone(), type_tag));
                    }
                }
            }
            Some(masks) => {
                for (decoded, types) in raw {
                    for mask in masks {
                        if decoded.matches_symmetric(mask) {
                            let mut segs = decoded.segments().to_vec();
                            for (i, seg) in mask.segments().iter().enumerate() {
                                if i < segs.len() {
                                    segs[i] = seg.clone();
                                }
                            }
                            let shaped = Path::new(segs).expect("reassembled from already-valid segments");
                            for type_tag in &types {
                                result.push((shaped.clone(), *type_tag));
                            }
                        }
                    }
                }
            }
        }
        Ok(result)
    }

    /// Read every stored value whose per-field table is `(path, type_tag)`,
    /// filling in concrete indices from the row's index columns.
    pub async fn get_field_value(
        &mut self,
        id: i64,
        path: &Path,
        type_tag: TypeTag,
    ) -> Result<Vec<(Path, Value)>, Error> {
        let table = path.encode(type_tag);
        if !self.engine.table_exists(&table).await.map_err(Error::engine)? {
            return Ok(Vec::new());
        }

        let (where_cond, idx_binds) = columns::where_clause(path);
        let select_cols = columns::select_clause(path);
        let mut binds = vec![SqlValue::Id(id)];
        binds.extend(idx_binds);

        let rows = self
            .engine
            .execute(
                &format!("SELECT {VALUE_COLUMN}{select_cols} FROM {{}} WHERE {ID_COLUMN}=?{where_cond}"),
                &[&table],
                &binds,
            )
            .await
            .map_err(Error::engine)?;

        let index_count = path.index_column_count();
        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let value = row_to_value(row.get(0), type_tag);
            let indices: Vec<i64> = (0..index_count).map(|i| row.get_i64(1 + i).unwrap_or(0)).collect();
            out.push((path.with_indices_filled(&indices), value));
        }
        Ok(out)
    }

    pub async fn assure_field_table_exists(&mut self, path: &Path, type_tag: TypeTag) -> Result<(), Error> {
        let table = path.encode(type_tag);
        if !self.engine.table_exists(&table).await.map_err(Error::engine)? {
            let value_col_type = match type_tag {
                TypeTag::Str => self.text_type,
                TypeTag::Int | TypeTag::Null | TypeTag::EmptyMap | TypeTag::EmptyList => self.int_type,
                TypeTag::Float => self.float_type,
                TypeTag::Bytes => self.bytes_type,
            };
            let col_defs = columns::column_defs(path, self.int_type);
            let spec = format!("({ID_COLUMN} {}, {VALUE_COLUMN} {value_col_type}{col_defs})", self.id_type);
            self.engine
                .execute(&format!("CREATE TABLE {{}} {spec}"), &[&table], &[])
                .await
                .map_err(Error::engine)?;
        }
        Ok(())
    }

    /// Insert one value row for a fully-determined field.
    pub async fn add_value_record(&mut self, id: i64, path: &Path, value: &Value) -> Result<(), Error> {
        debug_assert!(path.is_determined(), "add_value_record requires a fully determined path");
        let table = path.encode(value.type_tag());
        let mut binds = vec![SqlValue::Id(id), SqlValue::from(value)];
        for segment in path.segments() {
            if let PathSegment::Index(i) = segment {
                binds.push(SqlValue::Int(*i as i64));
            }
        }
        let placeholders: String = std::iter::repeat_n(", ?", path.index_column_count()).collect();
        self.engine
            .execute(&format!("INSERT INTO {{}} VALUES (?, ?{placeholders})"), &[&table], &binds)
            .await
            .map_err(Error::engine)?;
        Ok(())
    }

    /// Delete every row of `shape` (across all its stored types) matching
    /// `condition` (defaults to `shape`'s own index binding), decrementing
    /// refcounts and dropping the table if it becomes empty.
    pub async fn delete_values(
        &mut self,
        id: i64,
        shape: &Path,
        condition: Option<(String, Vec<SqlValue>)>,
    ) -> Result<(), Error> {
        let types = self.get_value_types(id, shape).await?;
        let (cond, cond_binds) = condition.unwrap_or_else(|| columns::where_clause(shape));

        for type_tag in types {
            let table = shape.encode(type_tag);
            let mut binds = vec![SqlValue::Id(id)];
            binds.extend(cond_binds.clone());

            let count_rows = self
                .engine
                .execute(
                    &format!("SELECT COUNT(*) FROM {{}} WHERE {ID_COLUMN}=?{cond}"),
                    &[&table],
                    &binds,
                )
                .await
                .map_err(Error::engine)?;
            let del_num = count_rows.first().and_then(|r| r.get_i64(0)).unwrap_or(0);

            if del_num > 0 {
                self.decrease_refcount(id, shape, type_tag, del_num).await?;
                self.engine
                    .execute(
                        &format!("DELETE FROM {{}} WHERE {ID_COLUMN}=?{cond}"),
                        &[&table],
                        &binds,
                    )
                    .await
                    .map_err(Error::engine)?;

                if self.engine.table_is_empty(&table).await.map_err(Error::engine)? {
                    self.engine.delete_table(&table).await.map_err(Error::engine)?;
                }
            }
        }
        Ok(())
    }

    /// Shift the list-element column of every `child_shape`-typed row at or
    /// past `starting_index`, scoped to `list_path`'s own (outer) indices.
    pub async fn renumber_list(
        &mut self,
        id: i64,
        list_path: &Path,
        child_shape: &Path,
        shift: i64,
        starting_index: i64,
    ) -> Result<(), Error> {
        let column = columns::column_name(columns::list_element_column(list_path));
        let (prefix_cond, prefix_binds) = columns::where_clause(list_path);

        for type_tag in self.get_value_types(id, child_shape).await? {
            let table = child_shape.encode(type_tag);
            let mut binds = vec![SqlValue::Int(shift), SqlValue::Id(id)];
            binds.extend(prefix_binds.clone());
            binds.push(SqlValue::Int(starting_index));

            self.engine
                .execute(
                    &format!("UPDATE {{}} SET {column}={column}+? WHERE {ID_COLUMN}=?{prefix_cond} AND {column}>=?"),
                    &[&table],
                    &binds,
                )
                .await
                .map_err(Error::engine)?;
        }
        Ok(())
    }

    /// Largest element index of the list at `list_path` across every type
    /// that has an element there, or `None` if the list is empty/absent.
    pub async fn get_max_list_index(&mut self, id: i64, list_path: &Path) -> Result<Option<i64>, Error> {
        let element_mask = list_path.with_pushed(PathSegment::Wildcard);
        let fields_info = self.get_fields_info(id, Some(std::slice::from_ref(&element_mask))).await?;

        let column = columns::column_name(columns::list_element_column(list_path));
        let (prefix_cond, prefix_binds) = columns::where_clause(list_path);

        let mut max: Option<i64> = None;
        let mut seen_tables = Vec::new();
        for (shape, type_tag) in fields_info {
            let table = shape.encode(type_tag);
            if seen_tables.contains(&table) {
                continue;
            }
            seen_tables.push(table.clone());

            let mut binds = vec![SqlValue::Id(id)];
            binds.extend(prefix_binds.clone());
            let rows = self
                .engine
                .execute(
                    &format!("SELECT MAX({column}) FROM {{}} WHERE {ID_COLUMN}=?{prefix_cond}"),
                    &[&table],
                    &binds,
                )
                .await
                .map_err(Error::engine)?;
            if let Some(found) = rows.first().and_then(|r| r.get_i64(0)) {
                max = Some(max.map_or(found, |m| m.max(found)));
            }
        }
        Ok(max)
    }

    pub async fn object_has_field(&mut self, id: i64, path: &Path) -> Result<bool, Error> {
        if path.is_empty() {
            return Ok(true);
        }
        let types = self.get_value_types(id, path).await?;
        if types.is_empty() {
            return Ok(false);
        }
        let (cond, idx_binds) = columns::where_clause(path);
        let mut total = 0i64;
        for type_tag in types {
            let table = path.encode(type_tag);
            let mut binds = vec![SqlValue::Id(id)];
            binds.extend(idx_binds.clone());
            let rows = self
                .engine
                .execute(
                    &format!("SELECT COUNT(*) FROM {{}} WHERE {ID_COLUMN}=?{cond}"),
                    &[&table],
                    &binds,
                )
                .await
                .map_err(Error::engine)?;
            total += rows.first().and_then(|r| r.get_i64(0)).unwrap_or(0);
        }
        Ok(total > 0)
    }

    pub async fn select_existing_tables(&mut self, names: &[String]) -> Result<Vec<String>, Error> {
        self.engine.select_existing_tables(names).await.map_err(Error::engine)
    }

    pub async fn run_compiled(&mut self, query: &CompiledQuery) -> Result<Vec<Row>, Error> {
        let table_refs: Vec<&str> = query.tables.iter().map(|s| s.as_str()).collect();
        self.engine
            .execute(&query.template, &table_refs, &query.binds)
            .await
            .map_err(Error::engine)
    }

    /// Pure recursive compiler: a normalized condition tree (NOT already
    /// propagated to the leaves by `crate::condition::propagate_inversion`)
    /// plus the set of per-field tables known to exist, compiled into
    /// nested `INTERSECT`/`UNION`/`EXCEPT` set algebra.
    pub fn compile_condition(
        &self,
        condition: Option<&Condition>,
        existing_tables: &std::collections::HashSet<String>,
    ) -> Option<CompiledQuery> {
        match condition {
            None => Some(CompiledQuery {
                template: format!("SELECT DISTINCT {ID_COLUMN} FROM {{}}"),
                tables: vec![self.id_table.clone()],
                binds: vec![],
            }),
            Some(Condition::Node { left, op, right, invert }) => {
                debug_assert!(!invert, "inversion must be propagated to leaves before compiling");
                let left_q = self.compile_condition(Some(left), existing_tables);
                let right_q = self.compile_condition(Some(right), existing_tables);
                match (left_q, right_q) {
                    (None, None) => None,
                    (None, Some(r)) => matches!(op, LogicalOp::Or).then_some(r),
                    (Some(l), None) => matches!(op, LogicalOp::Or).then_some(l),
                    (Some(l), Some(r)) => {
                        let op_kw = match op {
                            LogicalOp::And => "INTERSECT",
                            LogicalOp::Or => "UNION",
                        };
                        let template = format!(
                            "SELECT * FROM ({}) as left_q {op_kw} SELECT * FROM ({}) as right_q",
                            l.template, r.template
                        );
                        let mut tables = l.tables;
                        tables.extend(r.tables);
                        let mut binds = l.binds;
                        binds.extend(r.binds);
                        Some(CompiledQuery { template, tables, binds })
                    }
                }
            }
            Some(Condition::Leaf { path, comparator, literal, invert }) => {
                let table = path.encode(literal.type_tag());
                if !existing_tables.contains(&table) {
                    return if *invert {
                        Some(CompiledQuery {
                            template: format!("SELECT DISTINCT {ID_COLUMN} FROM {{}}"),
                            tables: vec![self.id_table.clone()],
                            binds: vec![],
                        })
                    } else {
                        None
                    };
                }

                let not_str = if *invert { " NOT " } else { " " };
                let cmp: &str = match comparator {
                    Comparator::Eq => "=",
                    Comparator::Regexp => self.engine.get_regexp_op(),
                    Comparator::Lt => "<",
                    Comparator::Gt => ">",
                    Comparator::Lte => "<=",
                    Comparator::Gte => ">=",
                };
                let (idx_where, idx_binds) = columns::where_clause(path);
                let mut binds = vec![SqlValue::from(literal)];
                binds.extend(idx_binds);

                let mut template = format!(
                    "SELECT DISTINCT {ID_COLUMN} FROM {{}} WHERE{not_str}{VALUE_COLUMN} {cmp} ?{idx_where}"
                );
                let mut tables = vec![table.clone()];
                if *invert {
                    template.push_str(&format!(
                        " UNION SELECT {ID_COLUMN} FROM (SELECT DISTINCT {ID_COLUMN} FROM {{}} EXCEPT SELECT DISTINCT {ID_COLUMN} FROM {{}}) as absent"
                    ));
                    tables.push(self.id_table.clone());
                    tables.push(table);
                }
                Some(CompiledQuery { template, tables, binds })
            }
        }
    }
}

fn row_to_value(cell: Option<&SqlValue>, type_tag: TypeTag) -> Value {
    match type_tag {
        TypeTag::EmptyMap => Value::EmptyMap,
        TypeTag::EmptyList => Value::EmptyList,
        TypeTag::Null => Value::Null,
        TypeTag::Str => match cell {
            Some(SqlValue::Str(s)) => Value::Str(s.clone()),
            _ => Value::Null,
        },
        TypeTag::Int => match cell {
            Some(SqlValue::Int(i)) | Some(SqlValue::Id(i)) => Value::Int(*i),
            _ => Value::Null,
        },
        TypeTag::Float => match cell {
            Some(SqlValue::Float(f)) => Value::Float(*f),
            _ => Value::Null,
        },
        TypeTag::Bytes => match cell {
            Some(SqlValue::Bytes(b)) => Value::Bytes(b.clone()),
            _ => Value::Null,
        },
    }
}
