use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{json, Value};
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

use iseqlc::catalog::{self, Catalog};
use iseqlc::pass::PassId;
use iseqlc::pipeline::{run_pipeline, CompilationState, Outcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum EmitStage {
    Iseql,
    Resolved,
    Explain,
    Diagnostics,
    BuildInfo,
    Catalog,
}

impl EmitStage {
    /// Last pass needed, `None` for stages that do not compile.
    fn terminal(self) -> Option<PassId> {
        match self {
            EmitStage::Iseql => Some(PassId::Serialize),
            EmitStage::Resolved | EmitStage::Explain => Some(PassId::Resolve),
            EmitStage::Diagnostics => Some(PassId::Validate),
            EmitStage::BuildInfo | EmitStage::Catalog => None,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "iseqlc",
    version,
    about = "ISEQL event-model compiler — validates temporal relation models and emits ISEQL patterns"
)]
struct Cli {
    /// Input event-model JSON document (`-` reads stdin)
    input: Option<PathBuf>,

    /// Output file path (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output stage
    #[arg(long, value_enum, default_value_t = EmitStage::Iseql)]
    emit: EmitStage,

    /// Operator catalog JSON to use instead of the embedded one
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Log pass timing (same as RUST_LOG=iseqlc=debug)
    #[arg(long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("iseqlc: error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "warn,iseqlc=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let catalog = load_catalog(cli.catalog.as_deref())?;
    debug!(operators = catalog.len(), "catalog loaded");

    if cli.emit == EmitStage::Catalog {
        write_output(cli.output.as_deref(), &catalog.listing())?;
        return Ok(ExitCode::SUCCESS);
    }

    let input_path = cli
        .input
        .as_deref()
        .context("no input document given (pass a path, or `-` for stdin)")?;
    let input = read_document(input_path)?;

    let mut state = CompilationState::new(input, &catalog);
    let Some(terminal) = cli.emit.terminal() else {
        let info = state.provenance().to_json(catalog.schema_version());
        write_output(cli.output.as_deref(), &info)?;
        return Ok(ExitCode::SUCCESS);
    };

    if let Err(e) = run_pipeline(&mut state, terminal, |_, _| {}) {
        debug!(%e, "pipeline stopped");
    }

    for issue in state.errors.iter().chain(&state.warnings) {
        eprintln!("{issue}");
    }

    let outcome = if state.has_error {
        Outcome::Rejected
    } else {
        Outcome::Accepted
    };

    let text = match cli.emit {
        EmitStage::Diagnostics => Some(pretty(&json!({
            "outcome": outcome,
            "errors": state.errors,
            "warnings": state.warnings,
        }))?),
        _ if state.has_error => None,
        EmitStage::Iseql => state.iseql.clone(),
        EmitStage::Resolved => match &state.resolved {
            Some(model) => Some(pretty(&model.to_document()?)?),
            None => None,
        },
        EmitStage::Explain => Some(pretty(&serde_json::to_value(&state.explain)?)?),
        EmitStage::BuildInfo | EmitStage::Catalog => None,
    };

    if let Some(text) = text {
        write_output(cli.output.as_deref(), &text)?;
    }

    Ok(match outcome {
        Outcome::Accepted => ExitCode::SUCCESS,
        Outcome::Rejected => ExitCode::from(1),
    })
}

fn load_catalog(path: Option<&Path>) -> Result<Catalog> {
    match path {
        Some(path) => Catalog::from_path(path)
            .with_context(|| format!("cannot load operator catalog {}", path.display())),
        None => catalog::load_builtin().context("embedded operator catalog is corrupt"),
    }
}

fn read_document(path: &Path) -> Result<Value> {
    let text = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("cannot read stdin")?;
        buf
    } else {
        std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?
    };
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
}

fn pretty(value: &Value) -> Result<String> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    Ok(text)
}

fn write_output(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, text).with_context(|| format!("cannot write {}", path.display()))
        }
        None => {
            print!("{text}");
            Ok(())
        }
    }
}
