mod bootstrap;
mod presenter;

use std::{borrow::Cow, env, fs, process};

use bootstrap::{AppConfig, init_logging};
use presenter::ReportPresenter;
use splitledger_application::ScriptProcessor;

type CliResult<T> = Result<T, Cow<'static, str>>;

fn main() {
    init_logging();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn run() -> CliResult<()> {
    let Some(path) = env::args().nth(1) else {
        return Err("Usage: splitledger <script.ledger>".into());
    };

    let config = AppConfig::from_env().map_err(|err| format!("Invalid configuration: {err}"))?;
    tracing::debug!(
        scale = config.context.scale,
        rounding = ?config.context.rounding_mode,
        split_tolerance = %config.context.split_tolerance,
        epsilon = %config.context.epsilon,
        "Configuration loaded"
    );
    let source =
        fs::read_to_string(&path).map_err(|err| format!("Failed to read '{path}': {err}"))?;

    let outcome = ScriptProcessor::new(config.context)
        .process(&source)
        .map_err(|err| err.to_string())?;

    let rendered: Vec<String> = outcome.reports.iter().map(ReportPresenter::render).collect();
    print!("{}", rendered.join("\n"));
    Ok(())
}
