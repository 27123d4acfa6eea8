//! Object lifecycle store
//!
//! Tracks every object the trace creates, keyed by its handle string. Handles
//! are reused by the driver after release, so each handle maps to an
//! append-only history of records; resolution always returns the most recent
//! one. Records live in an arena and are referenced by [`ObjectId`], so the
//! whole store is a plain owned value.

use std::collections::HashMap;

use tracing::warn;

use crate::schema::ObjectKind;

/// Index into the object arena. Stable for the lifetime of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(pub usize);

/// One traced object: creation and (eventual) deletion position in the event
/// stream, plus its running reference count.
#[derive(Debug, Clone)]
pub struct ObjectRecord {
    /// Handle string as it appears in the log, e.g. `0x2f00`. Not unique over
    /// time; see [`ObjectStore::history`].
    pub handle: String,
    pub kind: ObjectKind,
    /// Starts at 1 on creation. Never goes negative: a release against a
    /// count already at 0 is ignored with a warning.
    pub reference_count: u32,
    /// Date (enqueue counter) of the event that created this object.
    pub creation_date: u64,
    /// Set exactly once, on the 1 -> 0 reference count transition.
    pub deletion_date: Option<u64>,
}

impl ObjectRecord {
    /// An object is leaked if its count never reached zero.
    pub fn is_live(&self) -> bool {
        self.deletion_date.is_none()
    }
}

/// Arena of object records plus the handle -> history table.
#[derive(Debug, Default)]
pub struct ObjectStore {
    records: Vec<ObjectRecord>,
    handles: HashMap<String, Vec<ObjectId>>,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new record for `handle` with reference count 1. Prior records
    /// under the same handle are kept; this one becomes the resolution target.
    pub fn create(&mut self, kind: ObjectKind, handle: &str, date: u64) -> ObjectId {
        let id = ObjectId(self.records.len());
        self.records.push(ObjectRecord {
            handle: handle.to_string(),
            kind,
            reference_count: 1,
            creation_date: date,
            deletion_date: None,
        });
        self.handles.entry(handle.to_string()).or_default().push(id);
        id
    }

    /// Most recently created record for `handle`, or `None` if the handle has
    /// no creation history (the object predates the trace window).
    pub fn resolve(&self, handle: &str) -> Option<ObjectId> {
        self.handles.get(handle).and_then(|h| h.last().copied())
    }

    /// Like [`resolve`](Self::resolve), but warns when the resolved record
    /// was already released before the referencing event. The result is
    /// unchanged; the lookup stays liveness-unchecked.
    pub fn resolve_at(&self, handle: &str, date: u64) -> Option<ObjectId> {
        let id = self.resolve(handle)?;
        if let Some(deleted) = self.records[id.0].deletion_date {
            if deleted < date {
                warn!(
                    handle,
                    deleted, date, "handle resolved to an already-released object"
                );
            }
        }
        Some(id)
    }

    pub fn get(&self, id: ObjectId) -> &ObjectRecord {
        &self.records[id.0]
    }

    /// Full creation history for a handle, oldest first.
    pub fn history(&self, handle: &str) -> &[ObjectId] {
        self.handles.get(handle).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn retain(&mut self, id: ObjectId) {
        self.records[id.0].reference_count += 1;
    }

    /// Decrement the reference count; on the 1 -> 0 transition, stamp the
    /// deletion date. A release at count 0 is a trace anomaly: warn and leave
    /// the record untouched.
    pub fn release(&mut self, id: ObjectId, date: u64) {
        let record = &mut self.records[id.0];
        if record.reference_count == 0 {
            warn!(
                handle = %record.handle,
                date, "release of an object whose reference count is already 0"
            );
            return;
        }
        record.reference_count -= 1;
        if record.reference_count == 0 {
            record.deletion_date = Some(date);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &ObjectRecord)> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, r)| (ObjectId(i), r))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
