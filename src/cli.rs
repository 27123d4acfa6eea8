//! CLI argument parsing for cltrace

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Output format for the run summary
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "cltrace")]
#[command(version)]
#[command(about = "Reconstruct events and object lifecycles from an OpenCL intercept log", long_about = None)]
pub struct Cli {
    /// Trace log produced by the intercept layer
    pub log: PathBuf,

    /// Dump directory to correlate (program sources and memDump* subdirectories)
    #[arg(short = 'd', long = "dump-dir", value_name = "DIR")]
    pub dump_dir: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug logging to stderr
    #[arg(long)]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_log_path() {
        let cli = Cli::parse_from(["cltrace", "trace.log"]);
        assert_eq!(cli.log, PathBuf::from("trace.log"));
        assert!(cli.dump_dir.is_none());
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_dump_dir_flag() {
        let cli = Cli::parse_from(["cltrace", "trace.log", "--dump-dir", "dumps"]);
        assert_eq!(cli.dump_dir, Some(PathBuf::from("dumps")));
    }

    #[test]
    fn test_cli_short_dump_dir_flag() {
        let cli = Cli::parse_from(["cltrace", "trace.log", "-d", "dumps"]);
        assert_eq!(cli.dump_dir, Some(PathBuf::from("dumps")));
    }

    #[test]
    fn test_cli_format_json() {
        let cli = Cli::parse_from(["cltrace", "trace.log", "--format", "json"]);
        assert!(matches!(cli.format, OutputFormat::Json));
    }

    #[test]
    fn test_cli_format_default_text() {
        let cli = Cli::parse_from(["cltrace", "trace.log"]);
        assert!(matches!(cli.format, OutputFormat::Text));
    }

    #[test]
    fn test_cli_requires_log_path() {
        assert!(Cli::try_parse_from(["cltrace"]).is_err());
    }
}
