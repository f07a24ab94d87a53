mod commands;

use berth_schema::{Action, BerthConfig, CommandRequest, ContainerState, ContainerType};
use clap::{Parser, Subcommand};
use commands::{EXIT_CONFIG_ERROR, EXIT_FAILURE, EXIT_STORE_ERROR};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "berth",
    version,
    about = "Container lifecycle control plane for local engines and clusters"
)]
struct Cli {
    /// Path to the berth.toml configuration file (default: $BERTH_CONFIG).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the status store directory from the configuration.
    #[arg(long, global = true)]
    store: Option<String>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create and start a project or dev-service container.
    Run(Target),
    /// Stop a container.
    Stop(Target),
    /// Pause a container.
    Pause(Target),
    /// Delete a container through the lifecycle dispatcher.
    Delete(Target),
    /// Send a raw command verb; unknown verbs leave everything unchanged.
    Dispatch {
        #[command(flatten)]
        target: Target,
        /// Command verb (run, stop, pause, delete).
        verb: String,
    },
    /// Delete a container; backend failures are reported, not raised.
    Remove(Target),
    /// List container status records.
    Ps {
        /// Only this environment.
        #[arg(long)]
        env: Option<String>,
        /// Only project containers of this project (in --env or the default environment).
        #[arg(long)]
        project: Option<String>,
    },
    /// Settle records pending longer than the timeout as unknown.
    Expire {
        /// Maximum pending age in seconds (default: pending_timeout_secs).
        #[arg(long)]
        max_age: Option<u64>,
    },
    /// Feed a backend status report into the status engine.
    Report {
        name: String,
        state: ContainerState,
        #[arg(long)]
        env: Option<String>,
        #[arg(long = "type", default_value = "project")]
        container_type: ContainerType,
        #[arg(long)]
        container_id: Option<String>,
        #[arg(long)]
        image: Option<String>,
    },
    /// Run diagnostic checks on configuration, drivers and the store.
    Doctor,
}

#[derive(Debug, clap::Args)]
struct Target {
    /// Container type: project, devmode, devservice or internal.
    container_type: ContainerType,
    /// Container name.
    name: String,
    /// Environment (default: the configured environment).
    #[arg(long)]
    env: Option<String>,
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("BERTH_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let result = load_config(cli.config.as_deref(), cli.store.as_deref())
        .and_then(|config| execute(cli.command, &config, cli.json));

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("configuration error:")
                || msg.starts_with("definitions error:")
            {
                EXIT_CONFIG_ERROR
            } else if msg.starts_with("store error:") || msg.starts_with("status store") {
                EXIT_STORE_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}

fn load_config(
    path: Option<&std::path::Path>,
    store: Option<&str>,
) -> Result<BerthConfig, String> {
    let mut config =
        BerthConfig::load_or_default(path).map_err(|e| format!("configuration error: {e}"))?;
    if let Some(store) = store {
        store.clone_into(&mut config.store.path);
    }
    config.store.path = expand_tilde(&config.store.path)
        .to_string_lossy()
        .into_owned();
    if let Some(definitions) = config.definitions.take() {
        config.definitions = Some(expand_tilde(&definitions.to_string_lossy()));
    }
    Ok(config)
}

fn execute(command: Commands, config: &BerthConfig, json: bool) -> Result<u8, String> {
    if let Commands::Doctor = command {
        return commands::doctor::run(config, json);
    }

    let mutating = matches!(
        command,
        Commands::Run(_)
            | Commands::Stop(_)
            | Commands::Pause(_)
            | Commands::Delete(_)
            | Commands::Dispatch { .. }
            | Commands::Remove(_)
    );
    let plane = commands::open_plane(config)?;
    if mutating && std::env::var("BERTH_SKIP_PREREQS").as_deref() != Ok("1") {
        let mode = plane.context().mode;
        let missing = berth_runtime::check_prereqs(mode, commands::driver_binary(config, mode));
        if !missing.is_empty() {
            return Err(berth_runtime::format_missing(&missing));
        }
    }

    match command {
        Commands::Run(t) => lifecycle(&plane, &t, &Action::Run.into(), json),
        Commands::Stop(t) => lifecycle(&plane, &t, &Action::Stop.into(), json),
        Commands::Pause(t) => lifecycle(&plane, &t, &Action::Pause.into(), json),
        Commands::Delete(t) => lifecycle(&plane, &t, &Action::Delete.into(), json),
        Commands::Dispatch { target, verb } => {
            lifecycle(&plane, &target, &CommandRequest::new(verb), json)
        }
        Commands::Remove(t) => {
            commands::lifecycle::remove(&plane, t.container_type, &t.name, t.env.as_deref(), json)
        }
        Commands::Ps { env, project } => {
            commands::ps::run(&plane, env.as_deref(), project.as_deref(), json)
        }
        Commands::Expire { max_age } => commands::expire::run(&plane, max_age, json),
        Commands::Report {
            name,
            state,
            env,
            container_type,
            container_id,
            image,
        } => commands::report::run(
            &plane,
            commands::report::ReportArgs {
                name,
                environment: env,
                container_type,
                state,
                container_id,
                image,
            },
            json,
        ),
        Commands::Doctor => commands::doctor::run(config, json),
    }
}

fn lifecycle(
    plane: &berth_core::ControlPlane,
    target: &Target,
    request: &CommandRequest,
    json: bool,
) -> Result<u8, String> {
    commands::lifecycle::run(
        plane,
        target.container_type,
        &target.name,
        target.env.as_deref(),
        request,
        json,
    )
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}
