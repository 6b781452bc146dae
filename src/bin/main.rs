use std::{error::Error, process::ExitCode};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use couchdb_io::{
    backend::CouchdbBinary,
    cli::{Cli, Commands, parse_args},
    converge::ConvergePolicy,
    error::ControlError,
    lifecycle::Lifecycle,
    ports::LoopbackPorts,
    runtime::RuntimeContext,
    settings::Settings,
    store::FileStore,
};

fn main() -> ExitCode {
    let args = parse_args();
    init_logging(&args);

    match run(args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("ERROR: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(args: &Cli) {
    let filter = match args.log_directive() {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(command: Commands) -> Result<(), Box<dyn Error>> {
    let runtime = RuntimeContext::from_env();
    let settings = Settings::load(&runtime.settings_path()).map_err(ControlError::from)?;
    debug!(
        "Runtime root {} (binary {:?})",
        runtime.root().display(),
        settings.binary
    );

    let policy = ConvergePolicy {
        interval: settings.poll_interval,
        timeout: settings.timeout,
    };
    let store = FileStore::new(runtime.store_path());
    let lifecycle = Lifecycle::new(
        runtime,
        CouchdbBinary::new(settings.binary),
        store,
        LoopbackPorts,
        policy,
    );

    match command {
        Commands::Start => {
            lifecycle.start()?;
        }
        Commands::Stop => {
            lifecycle.stop()?;
        }
        Commands::Status => {
            let state = lifecycle.status()?;
            println!("Running: {state}");
        }
        Commands::Config => {
            let report = lifecycle.config()?;
            println!("{}", report.to_pretty_json()?);
        }
    }

    Ok(())
}
