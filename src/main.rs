//! cloudpipe - command-line pipeline runner
//!
//! Runs a writer pipeline document to completion, or validates a pipeline
//! document and prints its canonical form.

use anyhow::{bail, Context, Result};
use cloudpipe::{
    logging, run_writer_pipeline, PipelineConfig, PipelineError, PipelineManager, StructureError,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const USAGE: &str = "Usage: cloudpipe <writer-pipeline.xml> [--config <file.toml>] [--max-points <n>]\n       cloudpipe --check <pipeline.xml>";

enum Command {
    Run {
        pipeline: PathBuf,
        config: Option<PathBuf>,
        max_points: Option<u64>,
    },
    Check {
        pipeline: PathBuf,
    },
}

fn parse_args(args: &[String]) -> Result<Command> {
    let mut pipeline = None;
    let mut config = None;
    let mut max_points = None;
    let mut check = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                config = Some(PathBuf::from(iter.next().context("--config needs a path")?));
            }
            "--max-points" => {
                let value = iter.next().context("--max-points needs a value")?;
                max_points = Some(
                    value
                        .parse::<u64>()
                        .with_context(|| format!("invalid --max-points '{}'", value))?,
                );
            }
            "--check" => check = true,
            other if other.starts_with("--") => bail!("unknown option '{}'", other),
            other => {
                if pipeline.replace(PathBuf::from(other)).is_some() {
                    bail!("only one pipeline file may be given");
                }
            }
        }
    }

    let pipeline = pipeline.context("missing pipeline file")?;
    Ok(if check {
        Command::Check { pipeline }
    } else {
        Command::Run {
            pipeline,
            config,
            max_points,
        }
    })
}

fn check(pipeline: &Path) -> Result<()> {
    let text = std::fs::read_to_string(pipeline)
        .with_context(|| format!("Failed to read {:?}", pipeline))?;

    // Either entry point is acceptable here.
    let mut manager = PipelineManager::new();
    let result = match manager.read_writer_pipeline_str(&text) {
        Err(PipelineError::Structure(StructureError::WrongPipelineKind { .. })) => {
            manager.read_reader_pipeline_str(&text)
        }
        other => other,
    };
    result.with_context(|| format!("Invalid pipeline {:?}", pipeline))?;
    print!("{}", manager.to_xml_string()?);
    Ok(())
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Check { pipeline } => check(&pipeline),
        Command::Run {
            pipeline,
            config,
            max_points,
        } => {
            let config = match config {
                Some(path) => PipelineConfig::load(&path)?,
                None => PipelineConfig::default(),
            };
            let _guard = logging::init(&config.logging)?;

            tracing::info!("Running pipeline {:?}", pipeline);
            let written = run_writer_pipeline(&pipeline, &config, max_points)?;
            println!("{}", written);
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("error: {}\n{}", e, USAGE);
            return ExitCode::from(2);
        }
    };

    match run(command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
