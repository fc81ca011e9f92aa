//! Binary entrypoint: evaluate a combo script, draw it headlessly, and print
//! every combo's value.

use std::{fs, path::PathBuf, process::ExitCode};

use clap::Parser;
use combo_bridge::{Host, Result, ScriptRuntime};
use egui::{Context, RawInput};
use logging::{self as logshared, LogArgs};
use tracing::{debug, error};

#[derive(Parser, Debug)]
#[command(
    name = "combo-run",
    about = "Run a combo script headlessly and report widget values",
    version
)]
/// Command-line interface for the `combo-run` binary.
struct Cli {
    /// Path to the Rhai script
    script: PathBuf,

    /// Number of headless frames to draw after the script runs
    #[arg(long, default_value_t = 1)]
    frames: usize,

    /// Logging controls
    #[command(flatten)]
    log: LogArgs,
}

/// Run `source`, draw `frames` frames draining callbacks after each, and
/// return `(name, value)` for every combo in draw order.
fn run_script(source: &str, frames: usize) -> Result<Vec<(String, String)>> {
    let mut rt = ScriptRuntime::new(Host::new());
    rt.run(source)?;

    let ctx = Context::default();
    for frame in 0..frames {
        let _output = ctx.run_ui(RawInput::default(), |ui| {
            let _outcomes = rt.host().show(ui);
        });
        let report = rt.run_callbacks();
        debug!(frame, ran = report.ran, failed = report.failed, "frame drawn");
    }

    rt.host()
        .item_names()
        .into_iter()
        .map(|name| rt.host().get_value(&name).map(|value| (name, value)))
        .collect()
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if !logshared::init(&cli.log.spec()) {
        eprintln!("combo-run: a tracing subscriber is already installed");
    }

    let source = match fs::read_to_string(&cli.script) {
        Ok(source) => source,
        Err(err) => {
            error!(path = %cli.script.display(), error = %err, "cannot read script");
            return ExitCode::FAILURE;
        }
    };

    match run_script(&source, cli.frames) {
        Ok(values) => {
            for (name, value) in values {
                println!("{name} = {value:?}");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", err.pretty());
            ExitCode::FAILURE
        }
    }
}
