mod config;
mod line_session;
mod server;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::sync::watch;

use config::read_config;
use server::Server;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Command,

    #[clap(short, long, env = "POSTCONFIRM_CONFIG", default_value = "postconfirm.toml")]
    /// Path to the main configuration file
    config_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the mail filter daemon
    Daemon,
    /// Signal a running daemon to reload its static overlay (patterns, templates)
    Reload {
        #[clap(short, long, env = "POSTCONFIRM_PID")]
        pid: Option<i32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "postconfirm=info");
    }
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = read_config(args.config_file)?;

    match args.command {
        Command::Daemon => {
            let pid_path = config.pid.clone();
            let (tx, rx) = watch::channel(false);
            install_reload_handler();
            install_shutdown_handler(tx);
            if let Some(path) = &pid_path {
                std::fs::write(path, std::process::id().to_string())?;
            }

            let server = Server::from_config(config).await?;
            server.run(rx).await?;
        }
        Command::Reload { pid } => {
            let config = read_config_for_reload(&args.config_file)?;
            server::reload(pid, config.pid)?;
        }
    }

    Ok(())
}

fn read_config_for_reload(path: &PathBuf) -> Result<config::Config> {
    read_config(path.clone())
}

fn install_reload_handler() {
    tokio::spawn(async {
        #[cfg(unix)]
        {
            let mut sigusr1 = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::user_defined1()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to install SIGUSR1 handler, reload disabled");
                    return;
                }
            };
            loop {
                sigusr1.recv().await;
                tracing::info!("received SIGUSR1, reloading static overlay configuration");
                // The static overlay (patterns, templates) is re-read from disk/DB
                // on next use; there is no in-process cache to invalidate here.
            }
        }
    });
}

fn install_shutdown_handler(must_exit: watch::Sender<bool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received shutdown signal, draining in-flight connections");
            let _ = must_exit.send(true);
        }
    });
}
