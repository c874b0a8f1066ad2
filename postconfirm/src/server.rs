use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::BufReader;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use postconfirm_filter::{ChallengeEmitter, Decider, DropFilter, RecipientPolicy, SmtpRelayer};
use postconfirm_store::{ensure_schema, PgConfig, PgMessageStash, PgSenderStore};

use crate::config::Config;
use crate::line_session::{read_transaction, write_verdict};

pub struct Server {
    listen_addr: String,
    decider: Arc<Decider>,
}

impl Server {
    pub async fn from_config(config: Config) -> Result<Self> {
        let pg_config = PgConfig {
            name: config.db.name,
            user: config.db.user,
            password: config.db.password,
            host: config.db.host,
            port: config.db.port,
            pool_max_connections: config.db.pool_max_connections,
        };

        let pool = pg_config.connect().await.context("connecting to the sender store database")?;
        ensure_schema(&pool).await.context("ensuring the sender store schema exists")?;

        let store = Arc::new(PgSenderStore::new(pool.clone(), config.confirm_ttl_seconds));
        let stash = Arc::new(PgMessageStash::new(pool));
        let relayer = Arc::new(SmtpRelayer::new(&config.smtp_host).context("building the SMTP relayer")?);

        let drop_filter = DropFilter::with_defaults(&config.bulk_regex, &config.auto_submitted_regex);
        let policy = RecipientPolicy::new(config.challenge_recipients);
        let emitter = ChallengeEmitter::new(config.mail_template, config.admin_address);

        let decider = Arc::new(Decider::new(store, stash, relayer, drop_filter, policy, emitter));

        Ok(Self {
            listen_addr: config.listen_addr,
            decider,
        })
    }

    pub async fn run(self, mut must_exit: watch::Receiver<bool>) -> Result<()> {
        let tcp = TcpListener::bind(&self.listen_addr)
            .await
            .with_context(|| format!("binding {}", self.listen_addr))?;
        info!(addr = %self.listen_addr, "postconfirm listening");

        loop {
            tokio::select! {
                accepted = tcp.accept() => {
                    let (socket, peer) = accepted?;
                    let decider = self.decider.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(socket, decider).await {
                            warn!(%peer, error = %e, "connection handling failed");
                        }
                    });
                }
                _ = must_exit.changed() => {
                    if *must_exit.borrow() {
                        break;
                    }
                }
            }
        }

        info!("postconfirm shutting down");
        Ok(())
    }
}

async fn handle_connection(mut socket: tokio::net::TcpStream, decider: Arc<Decider>) -> Result<()> {
    let peer = socket.peer_addr().ok();
    let (read_half, mut write_half) = socket.split();
    let mut reader = BufReader::new(read_half);

    while let Some(session) = read_transaction(&mut reader).await? {
        debug!(?peer, from = %session.envelope_from(), "transaction received");
        let verdict = decider.decide(&session).await;
        write_verdict(&mut write_half, verdict).await?;
    }

    Ok(())
}

pub fn reload(pid: Option<i32>, pid_path: Option<std::path::PathBuf>) -> Result<()> {
    use nix::sys::signal;
    use nix::unistd::Pid;
    use std::io::Read;

    let final_pid = match (pid, pid_path) {
        (Some(pid), _) => pid,
        (_, Some(path)) => {
            let mut f = std::fs::OpenOptions::new().read(true).open(path)?;
            let mut pidstr = String::new();
            f.read_to_string(&mut pidstr)?;
            pidstr.trim().parse::<i32>()?
        }
        _ => anyhow::bail!("unable to infer the daemon's PID; pass --pid or configure `pid` in the config file"),
    };

    signal::kill(Pid::from_raw(final_pid), signal::Signal::SIGUSR1)?;
    Ok(())
}
