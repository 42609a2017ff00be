//! Transaction-scoped facade over the Logic Layer.
//!
//! A `Session` owns the engine for the lifetime of one transaction: start it
//! with [`Session::begin`], issue requests through its typed methods, and
//! end it with [`Session::commit`] or [`Session::rollback`]. Dropping a
//! `Session` without calling either leaves the transaction open on the
//! engine — callers are expected to always resolve it explicitly, the way
//! a borrowed `tokio_postgres::Transaction` would.
//!
//! ```ignore
//! let mut session = Session::begin(&mut engine).await?;
//! let id = session.create(fields).await?;
//! session.commit().await?;
//! ```

use ddb_engine::Engine;
use ddb_proto::{Condition, Document, FieldWrite, ObjectId, Path, Request, Value};
use tracing::instrument;

use crate::codec;
use crate::error::Error;
use crate::logic::{Logic, Response};

pub struct Session<'e, E: Engine> {
    logic: Logic<'e, E>,
}

impl<'e, E: Engine> Session<'e, E> {
    /// Ensure the support tables exist, then open the transaction every
    /// subsequent request on this `Session` runs inside.
    #[instrument(skip_all)]
    pub async fn begin(engine: &'e mut E) -> Result<Self, Error> {
        let mut logic = Logic::new(engine).await?;
        logic.begin_transaction().await?;
        Ok(Session { logic })
    }

    pub async fn commit(self) -> Result<(), Error> {
        self.logic.commit_transaction().await
    }

    pub async fn rollback(self) -> Result<(), Error> {
        self.logic.rollback_transaction().await
    }

    /// Create a new object from a document, returning its id.
    pub async fn create(&mut self, document: &Document) -> Result<ObjectId, Error> {
        self.create_at(None, document).await
    }

    /// Create a new object whose document is written under `path` (the
    /// object's root, if `path` is `None`) instead of at the object's root.
    pub async fn create_at(&mut self, path: Option<Path>, document: &Document) -> Result<ObjectId, Error> {
        let fields = codec::flatten(document)?;
        match self.logic.process(Request::Create { path, fields }).await? {
            Response::Created(id) => Ok(id),
            _ => unreachable!("Create always yields Created"),
        }
    }

    /// Replace the subtree at `path` (relative writes under it) with `fields`.
    pub async fn modify(
        &mut self,
        id: ObjectId,
        path: Path,
        fields: Vec<FieldWrite>,
        remove_conflicts: bool,
    ) -> Result<(), Error> {
        let request = Request::Modify {
            id,
            path,
            fields,
            remove_conflicts,
        };
        match self.logic.process(request).await? {
            Response::Modified => Ok(()),
            _ => unreachable!("Modify always yields Modified"),
        }
    }

    /// Insert one or more new elements into a list, before or appended to it.
    pub async fn insert(
        &mut self,
        id: ObjectId,
        path: Path,
        field_groups: Vec<Vec<FieldWrite>>,
        remove_conflicts: bool,
    ) -> Result<(), Error> {
        let request = Request::insert(id, path, field_groups, remove_conflicts)?;
        match self.logic.process(request).await? {
            Response::Inserted => Ok(()),
            _ => unreachable!("Insert always yields Inserted"),
        }
    }

    /// Read the fields at `path` (or every field, with `path: None`),
    /// optionally narrowed by `masks`.
    pub async fn read(
        &mut self,
        id: ObjectId,
        path: Option<Path>,
        masks: Option<Vec<Path>>,
    ) -> Result<Vec<(Path, Value)>, Error> {
        match self.logic.process(Request::Read { id, path, masks }).await? {
            Response::Read(fields) => Ok(fields),
            _ => unreachable!("Read always yields Read"),
        }
    }

    /// Read the fields at `path` and rebuild them into a [`Document`].
    pub async fn read_document(&mut self, id: ObjectId, path: Option<Path>) -> Result<Document, Error> {
        let fields = self.read(id, path, None).await?;
        Ok(codec::build(&fields))
    }

    /// Delete `fields` under `id` (or the whole object, with `fields: None`).
    pub async fn delete(&mut self, id: ObjectId, fields: Option<Vec<Path>>) -> Result<(), Error> {
        match self.logic.process(Request::Delete { id, fields }).await? {
            Response::Deleted => Ok(()),
            _ => unreachable!("Delete always yields Deleted"),
        }
    }

    pub async fn search(&mut self, condition: Option<Condition>) -> Result<Vec<ObjectId>, Error> {
        match self.logic.process(Request::Search { condition }).await? {
            Response::Found(ids) => Ok(ids),
            _ => unreachable!("Search always yields Found"),
        }
    }

    pub async fn object_exists(&mut self, id: ObjectId) -> Result<bool, Error> {
        match self.logic.process(Request::ObjectExists { id }).await? {
            Response::Exists(exists) => Ok(exists),
            _ => unreachable!("ObjectExists always yields Exists"),
        }
    }

    pub async fn dump(&mut self) -> Result<Vec<(ObjectId, Document)>, Error> {
        match self.logic.process(Request::Dump).await? {
            Response::Dumped(objects) => Ok(objects),
            _ => unreachable!("Dump always yields Dumped"),
        }
    }

    /// Recompute `id_table` from scratch by scanning every per-field table.
    /// Recovers from a refcount/specification drift after a crash mid-write.
    pub async fn repair(&mut self) -> Result<(), Error> {
        match self.logic.process(Request::Repair).await? {
            Response::Repaired => Ok(()),
            _ => unreachable!("Repair always yields Repaired"),
        }
    }
}
