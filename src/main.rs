use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser, ValueEnum};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use vigil::commands::watch::{ResolveError, Target};
use vigil::commands::{cleanup, delete, list, watch};
use vigil::fs::Store;
use vigil::notify::{DesktopNotifier, EmailNotifier, Notify, RunNotifier, TerminalNotifier};
use vigil::registry::Registry;

const HELP_TEMPLATE: &str = "
   ┬  ┬┬┌─┐┬┬
   └┐┌┘││ ┬││
    └┘ ┴└─┘┴┴─┘

{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}";

#[derive(Parser)]
#[command(name = "vigil")]
#[command(about = "Posts a desktop notification, e-mail, or other alert when a process finishes")]
#[command(version)]
#[command(help_template = HELP_TEMPLATE)]
struct Cli {
    /// The process ID to monitor
    pid: Option<u32>,

    /// Specify the process by its name instead of its PID
    #[arg(short, long)]
    name: Option<String>,

    /// Execute the given command and create a notification on its completion
    #[arg(short, long, value_name = "COMMAND")]
    exec: Option<String>,

    /// Block until the monitored process terminates
    #[arg(short, long)]
    block: bool,

    /// List all pending and completed notifications
    #[arg(short, long)]
    list: bool,

    /// Cancel the pending notification for the process given by PID or --name
    #[arg(short, long)]
    delete: bool,

    /// Remove entries for finished and failed watches
    #[arg(short, long)]
    cleanup: bool,

    /// Notification method
    #[arg(short, long, value_enum)]
    mode: Option<Mode>,

    /// Run the given command when the process completes
    #[arg(short, long, value_name = "COMMAND")]
    run: Option<String>,

    /// Recipient address for '--mode email'
    #[arg(long, value_name = "ADDRESS")]
    email_to: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Desktop notification popup (the default)
    Desktop,
    /// Send an e-mail
    Email,
    /// Print a message to the terminal
    Term,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(exit_code_for(&err))
        }
    }
}

/// Exit codes: 1 for configuration and delivery-setup failures, 2 for a
/// named process that was not found, 3 for an ambiguous name.
fn exit_code_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<ResolveError>() {
        Some(ResolveError::NameNotFound(_)) => 2,
        Some(ResolveError::NameAmbiguous(_)) => 3,
        None => 1,
    }
}

fn run(cli: Cli) -> Result<()> {
    validate(&cli)?;

    let store = Store::open_default()?;
    let registry = Registry::new(store.clone());

    if cli.delete {
        delete::execute(&registry, cli.pid, cli.name.as_deref())?;
    }
    if cli.list {
        list::execute(&registry)?;
    }
    if cli.cleanup {
        cleanup::execute(&registry)?;
    }
    if cli.delete {
        return Ok(());
    }

    // Pure query invocation: nothing left to start
    if cli.pid.is_none()
        && cli.name.is_none()
        && cli.exec.is_none()
        && cli.mode.is_none()
        && cli.run.is_none()
    {
        return Ok(());
    }

    // Backend construction happens before any detachment so setup failures
    // exit here with no record created
    let notifier = notifier_for(&cli)?;
    let target = if let Some(command) = cli.exec {
        Target::Exec(command)
    } else if let Some(name) = cli.name {
        Target::Name(name)
    } else if let Some(pid) = cli.pid {
        Target::Pid(pid)
    } else {
        bail!("a PID, --name, or --exec target is required");
    };

    watch::execute(store, &target, notifier, cli.block)
}

/// Reject conflicting flag combinations before any process or state is
/// touched.
fn validate(cli: &Cli) -> Result<()> {
    let targets = [cli.pid.is_some(), cli.name.is_some(), cli.exec.is_some()];
    let target_count = targets.iter().filter(|given| **given).count();

    if target_count > 1 {
        usage_error("you may only specify at most one of PID, --name, and --exec")?;
    }
    if target_count == 0 && !(cli.list || cli.cleanup) {
        usage_error("a PID, --name, or --exec target is required (or --list/--cleanup)")?;
    }
    if cli.delete {
        if cli.pid.is_none() && cli.name.is_none() {
            usage_error("you must specify either a PID or a --name when using --delete")?;
        }
        if cli.mode.is_some() {
            usage_error("a notification --mode may not be specified when using --delete")?;
        }
        if cli.exec.is_some() {
            usage_error("the --exec option may not be specified when using --delete")?;
        }
        if cli.run.is_some() {
            usage_error("the --run option may not be specified when using --delete")?;
        }
    }
    Ok(())
}

fn usage_error(message: &str) -> Result<()> {
    eprintln!("{}\n", Cli::command().render_usage());
    bail!("{message}");
}

/// Pick the delivery backend from the parsed flags.
fn notifier_for(cli: &Cli) -> Result<Box<dyn Notify>> {
    if let Some(command) = &cli.run {
        return Ok(Box::new(RunNotifier::new(command.clone())));
    }
    match cli.mode.unwrap_or(Mode::Desktop) {
        Mode::Desktop => Ok(Box::new(DesktopNotifier)),
        Mode::Term => Ok(Box::new(TerminalNotifier)),
        Mode::Email => {
            let to = cli
                .email_to
                .clone()
                .context("'--mode email' requires --email-to")?;
            Ok(Box::new(EmailNotifier::new(to)))
        }
    }
}
