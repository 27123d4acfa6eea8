//! Log scanner
//!
//! Streams the raw intercept log line by line, keeps only call/return marker
//! lines, pairs them in order, and drives the dispatcher over each pair. The
//! scanner owns the run's accumulating state (event log + object store) and
//! returns it whole as a [`Trace`]; nothing is shared or global.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, warn};

use crate::extract::{Dispatcher, Event, TraceError, Value};
use crate::object::ObjectStore;
use crate::schema::Lifecycle;

/// Prefix marking the call half of an invocation.
pub const CALL_MARKER: &str = "<<<<";

/// Prefix marking the return half of an invocation.
pub const RETURN_MARKER: &str = ">>>>";

/// Everything one parse reconstructs: the ordered event log and the object
/// lifecycle store. Owned by the caller; a fresh one per invocation.
#[derive(Debug, Default)]
pub struct Trace {
    pub events: Vec<Event>,
    pub objects: ObjectStore,
}

impl Trace {
    /// Events of one kind, in log order.
    pub fn events_of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Event> {
        self.events.iter().filter(move |e| e.kind == kind)
    }
}

/// Parse a trace log from any buffered reader. The log is consumed as a lazy
/// line sequence; only the current pair is held in memory.
pub fn parse<R: BufRead>(reader: R) -> Result<Trace, TraceError> {
    let dispatcher = Dispatcher::new();
    parse_with(&dispatcher, reader)
}

/// Parse using an already-compiled dispatcher (useful when parsing several
/// logs against the same catalog).
pub fn parse_with<R: BufRead>(dispatcher: &Dispatcher, reader: R) -> Result<Trace, TraceError> {
    let mut trace = Trace::default();
    let mut pending_call: Option<String> = None;

    for line in reader.lines() {
        let line = line?;
        if !line.starts_with(CALL_MARKER) && !line.starts_with(RETURN_MARKER) {
            continue;
        }
        match pending_call.take() {
            None => pending_call = Some(line),
            Some(call_line) => process_pair(dispatcher, &call_line, &line, &mut trace)?,
        }
    }

    // A trailing unpaired line is dropped, never emitted as a partial event.
    if let Some(line) = pending_call {
        debug!(line = %line, "dropping trailing unpaired trace line");
    }
    Ok(trace)
}

/// Open and parse a trace log file.
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Trace, TraceError> {
    let file = File::open(path)?;
    parse(BufReader::new(file))
}

fn process_pair(
    dispatcher: &Dispatcher,
    call_line: &str,
    return_line: &str,
    trace: &mut Trace,
) -> Result<(), TraceError> {
    let extraction = dispatcher.dispatch(call_line, return_line, &trace.objects)?;
    let mut event = extraction.event;

    // Object-returning call: on success with a returned handle, publish a new
    // record and bind it to the event. A success status without the returned
    // token asserts no object.
    if let (Some(kind), Some(handle)) = (
        extraction.schema.returned,
        extraction.returned_handle.as_deref(),
    ) {
        if event.succeeded() {
            let id = trace.objects.create(kind, handle, event.date);
            event.returned = Some(id);
        }
    }

    apply_lifecycle(extraction.schema.lifecycle, &event, &mut trace.objects);
    trace.events.push(event);
    Ok(())
}

/// Apply the schema's retain/release action to the resolved target object.
/// An unresolved target (raw handle, or field absent from the line) is a
/// non-fatal trace anomaly: warn and continue.
fn apply_lifecycle(lifecycle: Lifecycle, event: &Event, objects: &mut ObjectStore) {
    let (param, retain) = match lifecycle {
        Lifecycle::None => return,
        Lifecycle::Retain(param) => (param, true),
        Lifecycle::Release(param) => (param, false),
    };
    match event.arg(param) {
        Some(&Value::Object(id)) => {
            if retain {
                objects.retain(id);
            } else {
                objects.release(id, event.date);
            }
        }
        other => warn!(
            kind = event.kind,
            param,
            date = event.date,
            resolved = other.is_some(),
            "lifecycle target did not resolve to a known object"
        ),
    }
}
