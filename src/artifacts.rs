//! Artifact matcher
//!
//! Correlates the on-disk dumps an intercepted run leaves behind with the
//! events reconstructed from its trace log. Program source dumps live in the
//! dump root and carry the program ordinal in their name; buffer dumps live
//! under the pre/post-enqueue subdirectories and carry the enqueue ordinal
//! and argument index. Both passes are independent and order-independent.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::extract::Value;
use crate::scanner::Trace;
use crate::schema::{CREATE_PROGRAM_WITH_SOURCE, ENQUEUE_NDRANGE_KERNEL, PROGRAM_NUMBER_FIELD};

/// Subdirectory holding buffer contents captured before each enqueue.
pub const MEMDUMP_PRE_DIR: &str = "memDumpPreEnqueue";

/// Subdirectory holding buffer contents captured after each enqueue.
pub const MEMDUMP_POST_DIR: &str = "memDumpPostEnqueue";

/// Index of an event in [`Trace::events`].
pub type EventId = usize;

/// The three association maps produced by one matching pass.
#[derive(Debug, Default)]
pub struct ArtifactIndex {
    /// Program source dump -> the CreateProgramWithSource event that made it.
    pub program_sources: HashMap<PathBuf, EventId>,
    /// Pre-enqueue buffer dump -> (enqueue event, kernel argument index).
    pub buffer_inputs: HashMap<PathBuf, (EventId, u64)>,
    /// Post-enqueue buffer dump -> (enqueue event, kernel argument index).
    pub buffer_outputs: HashMap<PathBuf, (EventId, u64)>,
}

/// Filename patterns compiled once; reusable across dump directories.
#[derive(Debug)]
pub struct ArtifactMatcher {
    program_source: Regex,
    buffer_dump: Regex,
}

impl ArtifactMatcher {
    pub fn new() -> Self {
        // Same shape the interceptor writes: CLI_<ordinal>_<hash>_source.cl
        // and Enqueue_<n>_Kernel_<name>_Arg_<i>_Buffer_<j>.bin.
        Self {
            program_source: Regex::new(r"CLI_(\d{4})_([0-9a-fA-F]{8})_source\.cl")
                .expect("static pattern"),
            buffer_dump: Regex::new(r"Enqueue_(\d+)_Kernel_(\w+?)_Arg_(\d+)_Buffer_(\d+)\.bin")
                .expect("static pattern"),
        }
    }

    /// Run both passes over `dump_dir` against an already-built trace.
    pub fn match_dir(&self, dump_dir: &Path, trace: &Trace) -> io::Result<ArtifactIndex> {
        let mut index = ArtifactIndex::default();
        self.match_program_sources(dump_dir, trace, &mut index.program_sources)?;
        self.match_buffer_dumps(
            &dump_dir.join(MEMDUMP_PRE_DIR),
            trace,
            &mut index.buffer_inputs,
        )?;
        self.match_buffer_dumps(
            &dump_dir.join(MEMDUMP_POST_DIR),
            trace,
            &mut index.buffer_outputs,
        )?;
        Ok(index)
    }

    fn match_program_sources(
        &self,
        dir: &Path,
        trace: &Trace,
        out: &mut HashMap<PathBuf, EventId>,
    ) -> io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let Some(captures) = self.program_source.captures(&name) else {
                continue;
            };
            let ordinal = captures[1].to_string();
            // First matching event wins; files matching no event are
            // silently excluded.
            let found = trace.events.iter().position(|e| {
                e.kind == CREATE_PROGRAM_WITH_SOURCE
                    && e.ret(PROGRAM_NUMBER_FIELD) == Some(&Value::Word(ordinal.clone()))
            });
            if let Some(event) = found {
                out.insert(entry.path(), event);
            }
        }
        Ok(())
    }

    /// One buffer-dump side. A missing subdirectory is a legitimate layout
    /// (dumping may be enabled for only one side) and yields zero matches.
    fn match_buffer_dumps(
        &self,
        dir: &Path,
        trace: &Trace,
        out: &mut HashMap<PathBuf, (EventId, u64)>,
    ) -> io::Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let Some(captures) = self.buffer_dump.captures(&name) else {
                continue;
            };
            let enqueue: u64 = captures[1].parse().unwrap_or(0);
            let arg: u64 = captures[3].parse().unwrap_or(0);
            let found = trace
                .events
                .iter()
                .position(|e| e.kind == ENQUEUE_NDRANGE_KERNEL && e.date == enqueue);
            if let Some(event) = found {
                out.insert(entry.path(), (event, arg));
            }
        }
        Ok(())
    }
}

impl Default for ArtifactMatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience wrapper: compile the patterns and run both passes.
pub fn match_artifacts(dump_dir: &Path, trace: &Trace) -> io::Result<ArtifactIndex> {
    ArtifactMatcher::new().match_dir(dump_dir, trace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner;
    use std::io::Cursor;

    fn trace_with_program_and_enqueue() -> Trace {
        let log = "\
<<<< clCreateContext: EnqueueCounter: 1 properties = [ p ] num_devices = 1 devices = [ d ]
>>>> clCreateContext: -> CL_SUCCESS returned 0x10
<<<< clCreateProgramWithSource: EnqueueCounter: 3 context = 0x10 count = 1
>>>> clCreateProgramWithSource: -> CL_SUCCESS program number = 0007 returned 0x30
<<<< clEnqueueNDRangeKernel: EnqueueCounter: 42 queue = 0x20 kernel = 0x40 global_work_offset = <0> global_work_size = <64> local_work_size = <8>
>>>> clEnqueueNDRangeKernel: -> CL_SUCCESS
";
        scanner::parse(Cursor::new(log)).unwrap()
    }

    fn touch(path: &Path) {
        std::fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_program_source_matches_by_ordinal() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("CLI_0007_deadbeef_source.cl");
        touch(&file);

        let trace = trace_with_program_and_enqueue();
        let index = match_artifacts(dir.path(), &trace).unwrap();

        assert_eq!(index.program_sources.len(), 1);
        let event = index.program_sources[&file];
        assert_eq!(trace.events[event].kind, CREATE_PROGRAM_WITH_SOURCE);
        assert_eq!(trace.events[event].date, 3);
    }

    #[test]
    fn test_program_source_with_unknown_ordinal_is_excluded() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("CLI_0099_deadbeef_source.cl"));

        let trace = trace_with_program_and_enqueue();
        let index = match_artifacts(dir.path(), &trace).unwrap();
        assert!(index.program_sources.is_empty());
    }

    #[test]
    fn test_non_dump_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("notes.txt"));
        touch(&dir.path().join("CLI_source.cl"));

        let trace = trace_with_program_and_enqueue();
        let index = match_artifacts(dir.path(), &trace).unwrap();
        assert!(index.program_sources.is_empty());
    }

    #[test]
    fn test_pre_enqueue_buffer_matches_by_date_and_keeps_arg_index() {
        let dir = tempfile::tempdir().unwrap();
        let pre = dir.path().join(MEMDUMP_PRE_DIR);
        std::fs::create_dir(&pre).unwrap();
        let file = pre.join("Enqueue_42_Kernel_foo_Arg_2_Buffer_0.bin");
        touch(&file);

        let trace = trace_with_program_and_enqueue();
        let index = match_artifacts(dir.path(), &trace).unwrap();

        assert_eq!(index.buffer_inputs.len(), 1);
        let (event, arg) = index.buffer_inputs[&file];
        assert_eq!(trace.events[event].kind, ENQUEUE_NDRANGE_KERNEL);
        assert_eq!(trace.events[event].date, 42);
        assert_eq!(arg, 2);
        assert!(index.buffer_outputs.is_empty());
    }

    #[test]
    fn test_post_enqueue_side_is_independent() {
        let dir = tempfile::tempdir().unwrap();
        let post = dir.path().join(MEMDUMP_POST_DIR);
        std::fs::create_dir(&post).unwrap();
        let file = post.join("Enqueue_42_Kernel_foo_Arg_0_Buffer_1.bin");
        touch(&file);

        let trace = trace_with_program_and_enqueue();
        let index = match_artifacts(dir.path(), &trace).unwrap();

        assert!(index.buffer_inputs.is_empty());
        assert_eq!(index.buffer_outputs.len(), 1);
        assert_eq!(index.buffer_outputs[&file].1, 0);
    }

    #[test]
    fn test_missing_subdirectories_yield_empty_maps() {
        let dir = tempfile::tempdir().unwrap();
        let trace = trace_with_program_and_enqueue();
        // No memDump* subdirectories at all: empty results, no error.
        let index = match_artifacts(dir.path(), &trace).unwrap();
        assert!(index.buffer_inputs.is_empty());
        assert!(index.buffer_outputs.is_empty());
    }

    #[test]
    fn test_buffer_dump_with_unknown_enqueue_is_excluded() {
        let dir = tempfile::tempdir().unwrap();
        let pre = dir.path().join(MEMDUMP_PRE_DIR);
        std::fs::create_dir(&pre).unwrap();
        touch(&pre.join("Enqueue_777_Kernel_foo_Arg_1_Buffer_0.bin"));

        let trace = trace_with_program_and_enqueue();
        let index = match_artifacts(dir.path(), &trace).unwrap();
        assert!(index.buffer_inputs.is_empty());
    }
}
