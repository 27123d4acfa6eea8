use anyhow::{Context, Result};
use clap::Parser;
use cltrace::cli::{Cli, OutputFormat};
use cltrace::report::RunSummary;
use cltrace::{artifacts, scanner};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let trace = scanner::parse_file(&cli.log)
        .with_context(|| format!("failed to parse trace log {}", cli.log.display()))?;

    let mut summary = RunSummary::from_trace(&trace);
    if let Some(dump_dir) = &cli.dump_dir {
        let index = artifacts::match_artifacts(dump_dir, &trace)
            .with_context(|| format!("failed to scan dump directory {}", dump_dir.display()))?;
        summary = summary.with_artifacts(&index);
    }

    match cli.format {
        OutputFormat::Text => print!("{}", summary.render_text()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }
    Ok(())
}
