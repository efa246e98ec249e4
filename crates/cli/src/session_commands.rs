use std::time::Duration;

use {
    anyhow::{Context, Result},
    clap::Subcommand,
    tether_config::TetherConfig,
    tether_sessions::{KeepAlive, SessionClient, SessionId},
    tracing::info,
};

#[derive(Subcommand)]
pub enum SessionAction {
    /// Open a new session and print its id.
    Open {
        /// Report a malformed identifier as "no session" instead of failing.
        #[arg(long)]
        lenient: bool,
    },
    /// Ping a session once.
    Ping {
        /// Session id returned by `open`.
        id: SessionId,
    },
    /// Delete a session.
    Delete {
        /// Session id returned by `open`.
        id: SessionId,
    },
    /// Open a session and keep it alive until Ctrl-C, then delete it.
    Run {
        /// Seconds between pings (defaults to `session.ping_interval_secs`).
        #[arg(long)]
        interval: Option<u64>,
    },
}

pub async fn handle_session(action: SessionAction, config: &TetherConfig) -> Result<()> {
    let client = SessionClient::from_config(&config.session)?;
    match action {
        SessionAction::Open { lenient } => open(&client, lenient).await,
        SessionAction::Ping { id } => ping(&client, id).await,
        SessionAction::Delete { id } => delete(&client, id).await,
        SessionAction::Run { interval } => {
            let interval = interval
                .map(|secs| Duration::from_secs(secs.max(1)))
                .unwrap_or_else(|| config.session.ping_interval());
            run(client, interval).await
        },
    }
}

async fn open(client: &SessionClient, lenient: bool) -> Result<()> {
    if lenient {
        match client
            .open_session_lenient()
            .await
            .context("failed to open session")?
        {
            Some(id) => println!("{id}"),
            None => eprintln!("server returned a malformed session id"),
        }
        return Ok(());
    }
    let id = client.open_session().await.context("failed to open session")?;
    println!("{id}");
    Ok(())
}

async fn ping(client: &SessionClient, id: SessionId) -> Result<()> {
    client
        .ping_session(id)
        .await
        .with_context(|| format!("failed to ping session {id}"))?;
    println!("session {id} is alive");
    Ok(())
}

async fn delete(client: &SessionClient, id: SessionId) -> Result<()> {
    client
        .delete_session(id)
        .await
        .with_context(|| format!("failed to delete session {id}"))?;
    println!("session {id} deleted");
    Ok(())
}

async fn run(client: SessionClient, interval: Duration) -> Result<()> {
    let mut handle = KeepAlive::new(client, interval).spawn();

    let Some(id) = handle.wait_for_session().await else {
        return handle.shutdown().await.context("failed to open session");
    };
    println!("{id}");
    info!(session = %id, "keeping session alive, press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("shutting down");
    handle.shutdown().await.context("failed to close session")
}
