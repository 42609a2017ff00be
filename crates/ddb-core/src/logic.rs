//! Request handlers: turns a [`Request`] into reads/writes against the
//! [`Structure`] layer, enforcing conflict resolution, list density, and
//! refcount bookkeeping along the way.

use std::collections::HashSet;

use ddb_engine::Engine;
use ddb_proto::{Condition, Document, FieldWrite, ObjectId, Path, PathSegment, Request, TypeTag, Value};
use tracing::debug;

use crate::columns;
use crate::condition::propagate_inversion;
use crate::error::Error;
use crate::structure::Structure;

/// What processing a [`Request`] produces.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Created(ObjectId),
    Modified,
    Inserted,
    Deleted,
    Read(Vec<(Path, Value)>),
    Found(Vec<ObjectId>),
    Exists(bool),
    Dumped(Vec<(ObjectId, Document)>),
    Repaired,
}

pub struct Logic<'e, E: Engine> {
    structure: Structure<'e, E>,
}

impl<'e, E: Engine> Logic<'e, E> {
    pub async fn new(engine: &'e mut E) -> Result<Self, Error> {
        Ok(Logic {
            structure: Structure::new(engine).await?,
        })
    }

    pub async fn begin_transaction(&mut self) -> Result<(), Error> {
        self.structure.begin().await
    }

    pub async fn commit_transaction(&mut self) -> Result<(), Error> {
        self.structure.commit().await
    }

    pub async fn rollback_transaction(&mut self) -> Result<(), Error> {
        self.structure.rollback().await
    }

    pub async fn process(&mut self, request: Request) -> Result<Response, Error> {
        match request {
            Request::Create { path, fields } => {
                debug!("processing create request");
                Ok(Response::Created(self.process_create(path.as_ref(), &fields).await?))
            }
            Request::Modify { id, path, fields, remove_conflicts } => {
                debug!(id = id.0, "processing modify request");
                self.process_modify(id, &path, &fields, remove_conflicts).await?;
                Ok(Response::Modified)
            }
            Request::Insert { id, path, field_groups, remove_conflicts } => {
                debug!(id = id.0, "processing insert request");
                self.process_insert(id, &path, &field_groups, remove_conflicts).await?;
                Ok(Response::Inserted)
            }
            Request::Read { id, path, masks } => {
                debug!(id = id.0, "processing read request");
                let result = self.process_read(id, path.as_ref(), masks.as_deref()).await?;
                Ok(Response::Read(result))
            }
            Request::Delete { id, fields } => {
                debug!(id = id.0, "processing delete request");
                self.process_delete(id, fields.as_deref()).await?;
                Ok(Response::Deleted)
            }
            Request::Search { condition } => {
                debug!("processing search request");
                Ok(Response::Found(self.process_search(condition).await?))
            }
            Request::ObjectExists { id } => {
                debug!(id = id.0, "processing object-exists request");
                Ok(Response::Exists(self.structure.object_exists(id.0).await?))
            }
            Request::Dump => {
                debug!("processing dump request");
                Ok(Response::Dumped(self.process_dump().await?))
            }
            Request::Repair => {
                debug!("processing repair request");
                self.structure.repair_support_tables().await?;
                Ok(Response::Repaired)
            }
        }
    }

    async fn process_create(&mut self, path: Option<&Path>, fields: &[FieldWrite]) -> Result<ObjectId, Error> {
        let id = self.structure.get_new_id().await?;
        let root = Path::root();
        self.modify_fields(id, path.unwrap_or(&root), fields, true).await?;
        Ok(ObjectId(id))
    }

    async fn process_modify(
        &mut self,
        id: ObjectId,
        path: &Path,
        fields: &[FieldWrite],
        remove_conflicts: bool,
    ) -> Result<(), Error> {
        if !self.structure.object_exists(id.0).await? {
            return Err(Error::logic(format!("object {} does not exist", id.0)));
        }
        self.modify_fields(id.0, path, fields, remove_conflicts).await
    }

    async fn process_insert(
        &mut self,
        id: ObjectId,
        path: &Path,
        field_groups: &[Vec<FieldWrite>],
        remove_conflicts: bool,
    ) -> Result<(), Error> {
        let id = id.0;
        let list_path = path.parent();

        let existing_types = self.structure.get_value_types(id, &list_path).await?;
        if !existing_types.contains(&TypeTag::EmptyList) {
            if existing_types.is_empty() || remove_conflicts {
                let seed = [FieldWrite::new(Path::root(), Value::EmptyList)];
                self.modify_fields(id, &list_path, &seed, remove_conflicts).await?;
            } else {
                return Err(Error::structure("cannot insert into a field that is not a list"));
            }
        }

        if let Some(PathSegment::Index(i)) = path.last() {
            if *i > 0 {
                self.fill_with_nones(id, path).await?;
            }
        }

        let max = self.structure.get_max_list_index(id, &list_path).await?;
        let starting_index: i64 = match (max, path.last()) {
            (None, _) => 0,
            (Some(max), Some(PathSegment::Wildcard)) => max + 1,
            (Some(_), Some(PathSegment::Index(i))) => {
                self.renumber(id, path, field_groups.len() as i64).await?;
                *i as i64
            }
            _ => 0,
        };

        for (offset, group) in field_groups.iter().enumerate() {
            let element_path = list_path.with_pushed(PathSegment::Index(starting_index as usize + offset));
            for field in group {
                let absolute = element_path.joined(&field.path);
                self.set_field_value(id, &absolute, &field.value).await?;
            }
        }
        Ok(())
    }

    async fn process_read(
        &mut self,
        id: ObjectId,
        path: Option<&Path>,
        masks: Option<&[Path]>,
    ) -> Result<Vec<(Path, Value)>, Error> {
        let raw_id = id.0;
        let path = path.filter(|p| !p.is_empty());
        let masks = masks.filter(|m| !m.is_empty());

        let fields: Option<Vec<Path>> = match masks {
            None => path.map(|p| vec![p.clone()]),
            Some(masks) => Some(
                masks
                    .iter()
                    .filter(|m| path.is_none_or(|p| m.matches_symmetric(p)))
                    .cloned()
                    .collect(),
            ),
        };

        let typed_fields = self.structure.get_fields_info(raw_id, fields.as_deref()).await?;

        let mut result = Vec::new();
        for (shape, type_tag) in typed_fields {
            result.extend(self.structure.get_field_value(raw_id, &shape, type_tag).await?);
        }

        if result.is_empty() {
            return Err(Error::logic(match path {
                Some(p) => format!("object {raw_id} has no field matching {p:?}"),
                None => format!("object {raw_id} does not exist or has no fields"),
            }));
        }

        if let Some(p) = path {
            result = result
                .into_iter()
                .map(|(full, value)| {
                    let start = p.len().min(full.len());
                    let relative = Path::new(full.segments()[start..].to_vec())
                        .expect("suffix of an already-valid path is itself valid");
                    (relative, value)
                })
                .collect();
        }

        Ok(result)
    }

    async fn process_delete(&mut self, id: ObjectId, fields: Option<&[Path]>) -> Result<(), Error> {
        match fields {
            Some(fields) => {
                for field in fields {
                    self.delete_field(id.0, field).await?;
                }
                Ok(())
            }
            None => self.delete_object(id.0).await,
        }
    }

    async fn process_search(&mut self, condition: Option<Condition>) -> Result<Vec<ObjectId>, Error> {
        let normalized = condition.map(propagate_inversion);

        let existing: HashSet<String> = match &normalized {
            Some(cond) => {
                let mentioned: Vec<String> = mentioned_tables(cond).into_iter().collect();
                self.structure.select_existing_tables(&mentioned).await?.into_iter().collect()
            }
            None => HashSet::new(),
        };

        let Some(compiled) = self.structure.compile_condition(normalized.as_ref(), &existing) else {
            return Ok(Vec::new());
        };

        let rows = self.structure.run_compiled(&compiled).await?;
        Ok(rows.into_iter().filter_map(|r| r.get_i64(0)).map(ObjectId).collect())
    }

    async fn process_dump(&mut self) -> Result<Vec<(ObjectId, Document)>, Error> {
        let ids = self.process_search(None).await?;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let fields = self.process_read(id, None, None).await?;
            out.push((id, crate::codec::build(&fields)));
        }
        Ok(out)
    }

    // --- internal helpers, mirroring the original LogicLayer's private methods ---

    async fn set_field_value(&mut self, id: i64, path: &Path, value: &Value) -> Result<(), Error> {
        self.structure.assure_field_table_exists(path, value.type_tag()).await?;
        self.structure.increase_refcount(id, path, value.type_tag()).await?;
        self.structure.add_value_record(id, path, value).await?;
        Ok(())
    }

    /// Fill list-index gaps between the highest existing element and
    /// `path`'s own trailing index (exclusive) with explicit `Null`s, so the
    /// dense-list-index invariant holds once `path` itself is written.
    async fn fill_with_nones(&mut self, id: i64, path_with_index: &Path) -> Result<(), Error> {
        let Some(PathSegment::Index(end)) = path_with_index.last() else {
            return Ok(());
        };
        let end = *end as i64;
        let list_path = path_with_index.parent();

        let max = self.structure.get_max_list_index(id, &list_path).await?;
        let start = max.map_or(0, |m| m + 1);
        for i in start..end {
            let none_path = list_path.with_pushed(PathSegment::Index(i as usize));
            self.set_field_value(id, &none_path, &Value::Null).await?;
        }
        Ok(())
    }

    /// Ensure the container hierarchy down to (but not including) `path`
    /// matches what's already stored, deleting and rebuilding it when it
    /// doesn't and `remove_conflicts` allows that.
    async fn check_for_conflicts(&mut self, id: i64, path: &Path, remove_conflicts: bool) -> Result<(), Error> {
        let mut built = Path::root();
        let segments = path.segments();

        for (i, seg) in segments.iter().enumerate() {
            let types = self.structure.get_value_types(id, &built).await?;
            let mut values = Vec::new();
            for t in &types {
                values.extend(self.structure.get_field_value(id, &built, *t).await?);
            }
            if values.is_empty() {
                return Ok(());
            }

            let next_is_key = matches!(seg, PathSegment::Key(_));
            let satisfied = values.iter().any(|(_, v)| {
                (next_is_key && matches!(v, Value::EmptyMap)) || (!next_is_key && matches!(v, Value::EmptyList))
            });
            if satisfied {
                built.push(seg.clone());
                continue;
            }

            if !remove_conflicts {
                return Err(Error::structure(format!(
                    "{:?} conflicts with an existing field of a different shape",
                    built.with_pushed(seg.clone())
                )));
            }

            for shape in self.structure.get_fields_list(id, Some(&built), false).await? {
                self.structure.delete_values(id, &shape, None).await?;
            }

            let mut rebuild = built.clone();
            for lookahead in &segments[i..] {
                if matches!(rebuild.last(), Some(PathSegment::Index(_))) {
                    self.fill_with_nones(id, &rebuild).await?;
                }
                let container = if matches!(lookahead, PathSegment::Key(_)) {
                    Value::EmptyMap
                } else {
                    Value::EmptyList
                };
                self.set_field_value(id, &rebuild, &container).await?;
                rebuild.push(lookahead.clone());
            }
            return Ok(());
        }
        Ok(())
    }

    /// Write `fields` (relative to `path`), first replacing `path`'s
    /// existing subtree if present, else ensuring its container hierarchy
    /// and list density. Within `fields` itself, a later write at the same
    /// absolute path always wins over an earlier one.
    async fn modify_fields(
        &mut self,
        id: i64,
        path: &Path,
        fields: &[FieldWrite],
        remove_conflicts: bool,
    ) -> Result<(), Error> {
        if self.structure.object_has_field(id, path).await? {
            for shape in self.structure.get_fields_list(id, Some(path), false).await? {
                let (cond, binds) = columns::where_clause(path);
                self.structure.delete_values(id, &shape, Some((cond, binds))).await?;
            }
        } else if !path.is_empty() {
            self.check_for_conflicts(id, path, remove_conflicts).await?;

            let mut probe = path.clone();
            while !probe.is_empty() {
                if matches!(probe.last(), Some(PathSegment::Index(_))) {
                    self.fill_with_nones(id, &probe).await?;
                }
                probe.pop();
            }
        }

        for field in fields {
            let absolute_path = path.joined(&field.path);
            let (cond, binds) = columns::where_clause(&absolute_path);
            self.structure.delete_values(id, &absolute_path, Some((cond, binds))).await?;
            self.set_field_value(id, &absolute_path, &field.value).await?;
        }
        Ok(())
    }

    async fn delete_field(&mut self, id: i64, path: &Path) -> Result<(), Error> {
        if matches!(path.last(), Some(PathSegment::Index(_))) {
            self.renumber(id, path, -1).await?;
        } else {
            for shape in self.structure.get_fields_list(id, Some(path), false).await? {
                self.structure.delete_values(id, &shape, None).await?;
            }
        }
        Ok(())
    }

    async fn delete_object(&mut self, id: i64) -> Result<(), Error> {
        for field in self.structure.get_fields_list(id, None, false).await? {
            self.delete_field(id, &field).await?;
        }
        self.structure.delete_specification(id).await?;
        Ok(())
    }

    /// Shift (or, for `shift < 0`, remove then shift) every field rooted at
    /// `target`'s list, scoped to elements at or past `target`'s own index.
    async fn renumber(&mut self, id: i64, target: &Path, shift: i64) -> Result<(), Error> {
        let list_path = target.parent();
        let starting_index = match target.last() {
            Some(PathSegment::Index(i)) => *i as i64,
            _ => 0,
        };

        for child_shape in self.structure.get_fields_list(id, Some(target), false).await? {
            if shift < 0 {
                let (cond, binds) = columns::where_clause(target);
                self.structure.delete_values(id, &child_shape, Some((cond, binds))).await?;
            }
            self.structure
                .renumber_list(id, &list_path, &child_shape, shift, starting_index)
                .await?;
        }
        Ok(())
    }
}

fn mentioned_tables(condition: &Condition) -> HashSet<String> {
    match condition {
        Condition::Leaf { path, literal, .. } => {
            let mut set = HashSet::new();
            set.insert(path.encode(literal.type_tag()));
            set
        }
        Condition::Node { left, right, .. } => {
            let mut set = mentioned_tables(left);
            set.extend(mentioned_tables(right));
            set
        }
    }
}
