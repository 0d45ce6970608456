use clap::error::ErrorKind;
use clap::{ArgGroup, CommandFactory, Parser};
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use starter::configs::{StarterConfig, PID_DIR_VAR};
use starter::logging;
use starter::supervisor::{self, Service, SupervisorCommand};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Tool to start, restart, and stop services.
#[derive(Parser, Debug)]
#[command(version, about)]
#[command(group(ArgGroup::new("command").args(["start", "restart", "stop", "status"])))]
struct Args {
    /// Start the service and relaunch it whenever it asks to be restarted (default)
    #[arg(long)]
    start: bool,

    /// Restart the running service
    #[arg(long)]
    restart: bool,

    /// Stop the running service
    #[arg(long)]
    stop: bool,

    /// Tell whether the service is running
    #[arg(long)]
    status: bool,

    /// Directory holding `<service>.pid` [default: temporary directory]
    #[arg(long, env = PID_DIR_VAR, value_name = "DIR")]
    pid_dir: Option<PathBuf>,

    /// Configuration file
    #[arg(short, long, env = "STARTER_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Timestamped, more detailed logs
    #[arg(short, long)]
    verbose: bool,

    /// Program to run followed by its arguments; the program's file name
    /// names the service
    #[arg(
        value_name = "SERVICE",
        required = true,
        num_args = 1..,
        trailing_var_arg = true
    )]
    service: Vec<OsString>,
}

/// Commands also accepted with a single dash, `-stop svc`.
const SINGLE_DASH_COMMANDS: [&str; 4] = ["-start", "-restart", "-stop", "-status"];

/// Options whose value is the next argument.
const VALUE_OPTIONS: [&str; 3] = ["--pid-dir", "-c", "--config"];

impl Args {
    /// Parses the process arguments after turning single-dash commands into
    /// their `--` form. Only arguments before the service are touched.
    fn parse_normalized() -> Self {
        Self::parse_from(normalize(std::env::args_os()))
    }

    fn supervisor_command(&self) -> SupervisorCommand {
        if self.restart {
            SupervisorCommand::Restart
        } else if self.stop {
            SupervisorCommand::Stop
        } else if self.status {
            SupervisorCommand::Status
        } else {
            SupervisorCommand::Start
        }
    }
}

fn normalize(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    let mut args = args.into_iter();
    let mut normalized: Vec<OsString> = args.next().into_iter().collect();
    let mut value_pending = false;

    for arg in args.by_ref() {
        if value_pending {
            value_pending = false;
            normalized.push(arg);
            continue;
        }
        let Some(flag) = arg.to_str().map(str::to_owned) else {
            normalized.push(arg);
            break;
        };

        if SINGLE_DASH_COMMANDS.contains(&flag.as_str()) {
            normalized.push(format!("-{flag}").into());
        } else if VALUE_OPTIONS.contains(&flag.as_str()) {
            value_pending = true;
            normalized.push(arg);
        } else if flag.starts_with('-') && flag != "--" {
            normalized.push(arg);
        } else {
            normalized.push(arg);
            break;
        }
    }

    normalized.extend(args);
    normalized
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse_normalized();
    let config = match &args.config {
        Some(path) => StarterConfig::load(path)?,
        None => StarterConfig::default(),
    };
    logging::init(&config.log, args.verbose);

    let pid_dir = config.resolve_pid_dir(args.pid_dir.clone());
    let (program, service_args) = args
        .service
        .split_first()
        .ok_or_else(|| eyre!("Missing service"))?;
    let service = match Service::new(Path::new(program), service_args.to_vec(), &pid_dir) {
        Ok(service) => service,
        Err(err) => Args::command().error(ErrorKind::InvalidValue, err).exit(),
    };
    let command = args.supervisor_command();
    debug!(?command, ?service, "dispatching");

    let exit_code = supervisor::dispatch(command, &service)
        .await
        .wrap_err_with(|| format!("{} failed", service.name))?;
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}
