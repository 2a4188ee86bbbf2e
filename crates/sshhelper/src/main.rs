//! The `sshhelper` binary.

use std::path::{Path, PathBuf};
use std::process::exit;

use clap::Parser;
use clap::error::ErrorKind;
use sshhelper::config::config_path;
use sshhelper::interact::interact;
use sshhelper::{
    CommandRunner, Config, EnvConfig, Error, ExitCode, HostTable, LoginContext, LoginSession,
    PingProbe, PtySpawner, ResizeForwarder,
};
use tracing_subscriber::EnvFilter;

/// Log into a configured host over ssh, run its commands, and hand over
/// the session.
#[derive(Parser, Debug)]
#[command(name = "sshhelper", version, about)]
struct Cli {
    /// Configuration file [default: $SSHHELPER_CONFIG, then
    /// <config dir>/sshhelper/hosts.toml]
    #[arg(long, short, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Host address, or any unique part of one (11.3 for 192.168.11.3)
    host: String,
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_env("SSHHELPER_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn usage(hosts: &HostTable) -> String {
    format!(
        "usage: sshhelper [--config PATH] <HOST>\n\n\
         You can type a full address like 192.168.11.3 or any unique part\n\
         of one like 11.3 to ssh into it.\n\n{}",
        hosts.usage()
    )
}

fn load_config(explicit: Option<&Path>, env: &EnvConfig) -> sshhelper::Result<Config> {
    let path = config_path(explicit, env)?;
    let mut config = Config::load(&path)?;
    config.apply_env(env);
    Ok(config)
}

fn fail(err: &Error) -> ! {
    eprintln!("{err}");
    exit(err.exit_code().as_i32())
}

fn parse_args(env: &EnvConfig) -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = err.print();
            exit(ExitCode::Success.as_i32())
        }
        Err(err) => {
            let _ = err.print();
            if let Ok(config) = load_config(None, env) {
                eprintln!("\n{}", usage(&config.hosts));
            }
            exit(ExitCode::ArgsError.as_i32())
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_logging();

    let env = EnvConfig::default();
    let cli = parse_args(&env);
    let config = load_config(cli.config.as_deref(), &env).unwrap_or_else(|e| fail(&e));

    let profile = config.hosts.resolve(&cli.host).unwrap_or_else(|e| {
        if matches!(e, Error::ConfigMissing { .. }) {
            eprintln!("{e}\n\n{}", usage(&config.hosts));
            exit(e.exit_code().as_i32());
        }
        fail(&e)
    });

    let forwarder = ResizeForwarder::new();
    let _sigwinch = forwarder
        .install()
        .inspect_err(|e| tracing::warn!(error = %e, "terminal resizes will not be forwarded"))
        .ok();

    let prober = PingProbe::from_settings(&config.settings);
    let ctx = LoginContext {
        config: &config,
        spawner: &PtySpawner,
        prober: &prober,
        forwarder: &forwarder,
    };
    let session = LoginSession::new(&profile.endpoint, ctx);
    let runner = CommandRunner::new(config.settings.command_timeout);

    let scripted = async {
        let mut process = session.login().await?;
        runner.run_all(&mut process, &profile.commands).await?;
        Ok::<_, Error>(process)
    };

    let process = tokio::select! {
        result = scripted => result.unwrap_or_else(|e| fail(&e)),
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Canceling ...");
            exit(Error::Interrupted.exit_code().as_i32())
        }
    };

    if let Err(e) = interact(process, &forwarder).await {
        fail(&e);
    }
    exit(ExitCode::Success.as_i32())
}
