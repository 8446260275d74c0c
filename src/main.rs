use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde_sarif::sarif::Invocation;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

use classcheck::config::Thresholds;
use classcheck::engine::Engine;
use classcheck::report::{build_sarif, write_text};
use classcheck::scan::scan_inputs;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum Format {
    #[default]
    Sarif,
    Text,
}

/// CLI arguments for classcheck execution.
#[derive(Parser, Debug)]
#[command(
    name = "classcheck",
    about = "Design-principle, design-pattern, style and security heuristics for JVM class files and JAR files.",
    version
)]
struct Cli {
    #[arg(long, value_name = "PATH")]
    input: PathBuf,
    /// Classes used to resolve types; they are not analyzed.
    #[arg(long, value_name = "PATH")]
    classpath: Vec<PathBuf>,
    /// TOML file with threshold settings.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = Format::Sarif)]
    format: Format,
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
    /// Check id to skip; may be repeated.
    #[arg(long, value_name = "ID")]
    disable: Vec<String>,
    #[arg(long)]
    method_length_warning: Option<u32>,
    #[arg(long)]
    method_length_error: Option<u32>,
    #[arg(long)]
    max_fields: Option<u32>,
    #[arg(long)]
    max_methods: Option<u32>,
    #[arg(long)]
    no_lcom4: bool,
    /// Extra regex flagged as a hard-coded secret; may be repeated.
    #[arg(long, value_name = "REGEX")]
    secret_pattern: Vec<String>,
    #[arg(long, short)]
    verbose: bool,
    #[arg(long, short, conflicts_with = "verbose")]
    quiet: bool,
    #[arg(long)]
    timing: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    run(cli)
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    if !cli.input.exists() {
        anyhow::bail!("input not found: {}", cli.input.display());
    }
    for entry in &cli.classpath {
        if !entry.exists() {
            anyhow::bail!("classpath entry not found: {}", entry.display());
        }
    }

    let thresholds = load_thresholds(&cli)?;
    let mut engine = Engine::new(&thresholds).context("failed to configure checks")?;
    for id in &cli.disable {
        if !engine.remove_check(id) {
            anyhow::bail!("unknown check id: {id}");
        }
        debug!(check = %id, "check disabled");
    }

    let started_at = Instant::now();
    let scan = scan_inputs(&cli.input, &cli.classpath)?;
    let findings = engine.analyze_with_classpath(&scan.classes, &scan.classpath_classes);
    info!(
        classes = scan.classes.len(),
        findings = findings.len(),
        failures = scan.failures.len(),
        "analysis finished"
    );

    let artifact_count = scan.artifacts.len();
    let mut writer = output_writer(cli.output.as_deref())?;
    match cli.format {
        Format::Sarif => {
            let rules: Vec<_> = engine.checks().iter().map(|check| check.metadata()).collect();
            let sarif = build_sarif(&findings, &rules, scan.artifacts, build_invocation());
            serde_json::to_writer_pretty(&mut writer, &sarif)
                .context("failed to serialize SARIF output")?;
            writer
                .write_all(b"\n")
                .context("failed to write SARIF output")?;
        }
        Format::Text => {
            write_text(&mut writer, &findings).context("failed to write text output")?;
        }
    }

    if cli.timing && !cli.quiet {
        eprintln!(
            "timing: total_ms={} classes={} artifacts={} findings={}",
            started_at.elapsed().as_millis(),
            scan.class_count,
            artifact_count,
            findings.len()
        );
    }

    Ok(())
}

/// Config file values first, then command-line overrides, validated as set.
fn load_thresholds(cli: &Cli) -> Result<Thresholds> {
    let mut thresholds = match &cli.config {
        Some(path) => Thresholds::load(path)?,
        None => Thresholds::default(),
    };
    if cli.method_length_warning.is_some() || cli.method_length_error.is_some() {
        thresholds.set_method_length_thresholds(
            cli.method_length_warning
                .unwrap_or(thresholds.method_length_warning()),
            cli.method_length_error
                .unwrap_or(thresholds.method_length_error()),
        )?;
    }
    if cli.max_fields.is_some() || cli.max_methods.is_some() {
        thresholds.set_god_class_limits(
            cli.max_fields.unwrap_or(thresholds.max_fields()),
            cli.max_methods.unwrap_or(thresholds.max_methods()),
        )?;
    }
    if cli.no_lcom4 {
        thresholds.set_lcom4_enabled(false);
    }
    for pattern in &cli.secret_pattern {
        thresholds.add_secret_pattern(pattern)?;
    }
    Ok(thresholds)
}

fn output_writer(output: Option<&Path>) -> Result<Box<dyn Write>> {
    match output {
        Some(path) if path == Path::new("-") => Ok(Box::new(io::stdout())),
        Some(path) => Ok(Box::new(
            File::create(path).with_context(|| format!("failed to open {}", path.display()))?,
        )),
        None => Ok(Box::new(io::stdout())),
    }
}

fn build_invocation() -> Invocation {
    let arguments: Vec<String> = std::env::args().collect();
    let command_line = arguments.join(" ");

    Invocation::builder()
        .execution_successful(true)
        .arguments(arguments)
        .command_line(command_line)
        .build()
}
