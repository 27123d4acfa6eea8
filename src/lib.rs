//! cltrace - OpenCL intercept-log reconstruction with artifact correlation
//!
//! This library rebuilds a typed event stream and an object-lifecycle model
//! from the textual trace log an OpenCL intercept layer produces, and
//! correlates the dump files written during the same run (program sources,
//! pre/post-enqueue buffer snapshots) with the events that produced them.

pub mod artifacts;
pub mod cli;
pub mod extract;
pub mod object;
pub mod report;
pub mod scanner;
pub mod schema;
