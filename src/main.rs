use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tokio::io::AsyncReadExt;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use relief_verify::case::{CaseId, CaseStatus, ExtractionInput};
use relief_verify::cli::{Cli, Commands, Display, OutputFormat, StatusFilterArg};
use relief_verify::config::EngineConfig;
use relief_verify::error::{EngineError, Result};
use relief_verify::orchestrator::{CaseOrchestrator, VerificationReport};
use relief_verify::output::OutputWriter;

/// Context for command output handling.
struct OutputContext<'a> {
    display: &'a Display,
    writer: &'a OutputWriter,
}

impl OutputContext<'_> {
    fn is_text(&self) -> bool {
        self.writer.format() == OutputFormat::Text
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let format = cli.output;
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if format == OutputFormat::Json {
                let case_id = match &e {
                    EngineError::CaseFailed { case_id, .. } => Some(case_id.as_str()),
                    _ => None,
                };
                OutputWriter::new(format).emit_error(case_id, &e.to_string());
            } else {
                Display::new().print_error(&e.to_string());
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("relief_verify=debug")
    } else {
        EnvFilter::new("relief_verify=info")
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let display = Display::new();
    let writer = OutputWriter::new(cli.output);
    let out = OutputContext {
        display: &display,
        writer: &writer,
    };
    let config = EngineConfig::load(&cli.config).await?;

    match cli.command {
        Commands::Verify { input, locations } => cmd_verify(&out, &config, &input, locations).await,
        Commands::Show { case_id } => cmd_show(&out, &config, &case_id).await,
        Commands::List { status, limit } => cmd_list(&out, &config, status, limit).await,
        Commands::Stats => cmd_stats(&out, &config).await,
    }
}

async fn read_extraction(path: &Path) -> Result<ExtractionInput> {
    let content = if path.as_os_str() == "-" {
        let mut buf = String::new();
        tokio::io::stdin().read_to_string(&mut buf).await?;
        buf
    } else {
        tokio::fs::read_to_string(path).await?
    };
    Ok(serde_json::from_str(&content)?)
}

async fn cmd_verify(
    out: &OutputContext<'_>,
    config: &EngineConfig,
    input: &Path,
    locations: Vec<String>,
) -> Result<()> {
    let mut extraction = read_extraction(input).await?;
    if !locations.is_empty() {
        extraction.location_hints.extend(locations);
    }

    let orchestrator = CaseOrchestrator::from_config(config).await?;

    let spinner = out
        .is_text()
        .then(|| out.display.create_spinner("Gathering evidence..."));

    let result = orchestrator.run(&extraction).await;

    if let Some(s) = spinner {
        s.finish_and_clear();
    }

    let report = result?;
    if out.is_text() {
        out.display.print_report(&report);
    } else {
        out.writer.emit_report(&report);
    }
    Ok(())
}

async fn cmd_show(out: &OutputContext<'_>, config: &EngineConfig, case_id: &str) -> Result<()> {
    let orchestrator = CaseOrchestrator::from_config(config).await?;
    let record = orchestrator.show(&CaseId::from(case_id)).await?;

    if !out.is_text() {
        out.writer.emit_record(&record, orchestrator.rules());
        return Ok(());
    }

    match VerificationReport::from_record(&record, orchestrator.rules()) {
        Some(report) => out.display.print_report(&report),
        None => {
            out.display.print_case_detail(&record);
            if record.status == CaseStatus::Investigating {
                out.display
                    .print_warning("Case has not reached a verdict. It may have been interrupted.");
            }
        }
    }
    Ok(())
}

async fn cmd_list(
    out: &OutputContext<'_>,
    config: &EngineConfig,
    status: Option<StatusFilterArg>,
    limit: Option<usize>,
) -> Result<()> {
    let orchestrator = CaseOrchestrator::from_config(config).await?;
    let records = orchestrator.list_cases().await?;

    let filter: Option<CaseStatus> = status.map(Into::into);
    let filtered: Vec<_> = records
        .into_iter()
        .filter(|r| filter.is_none_or(|s| r.status == s))
        .take(limit.unwrap_or(usize::MAX))
        .collect();

    if out.is_text() {
        out.display.print_header("Cases");
        out.display.print_cases_table(&filtered);
    } else {
        out.writer.emit_list(&filtered);
    }
    Ok(())
}

async fn cmd_stats(out: &OutputContext<'_>, config: &EngineConfig) -> Result<()> {
    let orchestrator = CaseOrchestrator::from_config(config).await?;
    let stats = orchestrator.statistics().await?;

    if out.is_text() {
        out.display.print_statistics(&stats);
        if stats.total() == 0 {
            out.display.print_info("No cases recorded yet.");
        }
    } else {
        out.writer.emit_stats(&stats);
    }
    Ok(())
}
