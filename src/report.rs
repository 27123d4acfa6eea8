//! Run summary output
//!
//! Condenses a parsed trace (and optionally a matched dump directory) into a
//! serializable summary: event counts per kind plus the objects whose
//! reference count never reached zero. Leaked objects are the usual reason to
//! look at an intercept log in the first place.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::artifacts::ArtifactIndex;
use crate::scanner::Trace;

/// An object the trace created but never fully released.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeakedObject {
    pub handle: String,
    pub kind: String,
    pub creation_date: u64,
    /// Remaining reference count at end of trace.
    pub reference_count: u32,
}

/// Artifact-correlation counts, present only when a dump dir was matched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactSummary {
    pub program_sources: usize,
    pub buffer_inputs: usize,
    pub buffer_outputs: usize,
}

/// Whole-run summary, renderable as text or JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub events: usize,
    pub objects: usize,
    /// Event counts keyed by schema name, sorted for stable output.
    pub events_by_kind: BTreeMap<String, usize>,
    pub leaked: Vec<LeakedObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<ArtifactSummary>,
}

impl RunSummary {
    pub fn from_trace(trace: &Trace) -> Self {
        let mut events_by_kind = BTreeMap::new();
        for event in &trace.events {
            *events_by_kind.entry(event.kind.to_string()).or_insert(0) += 1;
        }
        let leaked = trace
            .objects
            .iter()
            .filter(|(_, record)| record.is_live())
            .map(|(_, record)| LeakedObject {
                handle: record.handle.clone(),
                kind: record.kind.label().to_string(),
                creation_date: record.creation_date,
                reference_count: record.reference_count,
            })
            .collect();
        Self {
            events: trace.events.len(),
            objects: trace.objects.len(),
            events_by_kind,
            leaked,
            artifacts: None,
        }
    }

    pub fn with_artifacts(mut self, index: &ArtifactIndex) -> Self {
        self.artifacts = Some(ArtifactSummary {
            program_sources: index.program_sources.len(),
            buffer_inputs: index.buffer_inputs.len(),
            buffer_outputs: index.buffer_outputs.len(),
        });
        self
    }

    /// Human-readable rendering for the default text output.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "events: {}  objects: {}", self.events, self.objects);
        for (kind, count) in &self.events_by_kind {
            let _ = writeln!(out, "  {:<24} {}", kind, count);
        }
        if let Some(artifacts) = &self.artifacts {
            let _ = writeln!(
                out,
                "artifacts: {} program sources, {} input buffers, {} output buffers",
                artifacts.program_sources, artifacts.buffer_inputs, artifacts.buffer_outputs
            );
        }
        if self.leaked.is_empty() {
            let _ = writeln!(out, "no leaked objects");
        } else {
            let _ = writeln!(out, "leaked objects: {}", self.leaked.len());
            for leak in &self.leaked {
                let _ = writeln!(
                    out,
                    "  {} {} created at {} (count {})",
                    leak.kind, leak.handle, leak.creation_date, leak.reference_count
                );
            }
        }
        out
    }
}
