//! Keep a single session alive: open it, ping it on an interval and delete it
//! on shutdown.

use std::time::Duration;

use {
    tokio::{
        sync::{oneshot, watch},
        task::JoinHandle,
        time::{Instant, MissedTickBehavior},
    },
    tracing::{info, warn},
};

use crate::{client::SessionClient, error::Result, id::SessionId};

/// Drives the lifecycle of one session against a [`SessionClient`].
#[derive(Debug, Clone)]
pub struct KeepAlive {
    client: SessionClient,
    interval: Duration,
}

/// Handle to a running [`KeepAlive`] task.
///
/// Dropping the handle without calling [`shutdown`](Self::shutdown) still
/// stops the loop and deletes the session, but nobody observes the result.
pub struct KeepAliveHandle {
    shutdown: Option<oneshot::Sender<()>>,
    session: watch::Receiver<Option<SessionId>>,
    task: JoinHandle<Result<()>>,
}

impl KeepAlive {
    pub fn new(client: SessionClient, interval: Duration) -> Self {
        // tokio intervals panic on a zero period.
        let interval = interval.max(Duration::from_millis(1));
        Self { client, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start the loop on the current tokio runtime.
    pub fn spawn(self) -> KeepAliveHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (session_tx, session_rx) = watch::channel(None);
        let task = tokio::spawn(self.run(shutdown_rx, session_tx));
        KeepAliveHandle {
            shutdown: Some(shutdown_tx),
            session: session_rx,
            task,
        }
    }

    async fn run(
        self,
        mut shutdown: oneshot::Receiver<()>,
        session: watch::Sender<Option<SessionId>>,
    ) -> Result<()> {
        // The open is never cancelled: once the server has issued an id it
        // must be deleted, even if shutdown was requested in the meantime.
        let id = self.client.open_session().await?;
        info!(session = %id, interval_secs = self.interval.as_secs(), "session opened");
        session.send_replace(Some(id));

        // First ping is due one full interval after open.
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // A shutdown signalled during the open resolves here before the
        // first tick, which is a full interval away.
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.client.ping_session(id).await {
                        warn!(session = %id, error = %e, "unable to ping session");
                    }
                },
            }
        }

        session.send_replace(None);
        self.client.delete_session(id).await?;
        info!(session = %id, "session closed");
        Ok(())
    }
}

impl KeepAliveHandle {
    /// The currently open session, if any.
    pub fn session_id(&self) -> Option<SessionId> {
        *self.session.borrow()
    }

    /// Watch the current session; `None` before open and after shutdown.
    pub fn subscribe(&self) -> watch::Receiver<Option<SessionId>> {
        self.session.clone()
    }

    /// Wait until a session is open. Returns `None` if the loop ended first,
    /// e.g. because opening failed; [`shutdown`](Self::shutdown) then yields
    /// the error.
    pub async fn wait_for_session(&mut self) -> Option<SessionId> {
        match self.session.wait_for(Option::is_some).await {
            Ok(current) => *current,
            Err(_) => None,
        }
    }

    /// Stop pinging, delete the session and wait for the loop to finish.
    ///
    /// If the session is still being opened, the open completes first and
    /// the issued session is deleted right away.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.task.await?
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::error::SessionError, mockito::Matcher};

    const ID: &str = "0d9b1f4e-3c2a-4e8f-a1b2-c3d4e5f60718";

    fn keep_alive(server: &mockito::ServerGuard, interval_ms: u64) -> KeepAlive {
        let client = SessionClient::new(&format!("{}/session", server.url())).unwrap();
        KeepAlive::new(client, Duration::from_millis(interval_ms))
    }

    #[tokio::test]
    async fn opens_pings_and_deletes() {
        let mut server = mockito::Server::new_async().await;
        let open = server
            .mock("GET", "/session/new")
            .with_status(200)
            .with_body(format!("\"{ID}\""))
            .expect(1)
            .create_async()
            .await;
        let ping = server
            .mock("GET", "/session/ping")
            .match_query(Matcher::UrlEncoded("uuid".into(), ID.into()))
            .with_status(200)
            .expect_at_least(2)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/session")
            .match_query(Matcher::UrlEncoded("session".into(), ID.into()))
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let keep_alive = keep_alive(&server, 40);
        assert_eq!(keep_alive.interval(), Duration::from_millis(40));
        let mut handle = keep_alive.spawn();
        let id = handle.wait_for_session().await.unwrap();
        assert_eq!(id.to_string(), ID);
        assert_eq!(handle.session_id(), Some(id));

        tokio::time::sleep(Duration::from_millis(200)).await;
        let watcher = handle.subscribe();
        handle.shutdown().await.unwrap();
        assert_eq!(*watcher.borrow(), None);

        open.assert_async().await;
        ping.assert_async().await;
        delete.assert_async().await;
    }

    #[test]
    fn zero_interval_is_clamped() {
        let client = SessionClient::new("http://127.0.0.1:9/session").unwrap();
        let keep_alive = KeepAlive::new(client, Duration::ZERO);
        assert_eq!(keep_alive.interval(), Duration::from_millis(1));
    }

    #[tokio::test]
    async fn ping_failures_do_not_stop_the_loop() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/session/new")
            .with_status(200)
            .with_body(format!("\"{ID}\""))
            .create_async()
            .await;
        let ping = server
            .mock("GET", "/session/ping")
            .match_query(Matcher::Any)
            .with_status(503)
            .expect_at_least(2)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/session")
            .match_query(Matcher::Any)
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let mut handle = keep_alive(&server, 30).spawn();
        handle.wait_for_session().await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.shutdown().await.unwrap();

        ping.assert_async().await;
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn open_failure_ends_the_loop() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/session/new")
            .with_status(500)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/session")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let mut handle = keep_alive(&server, 30).spawn();
        assert_eq!(handle.wait_for_session().await, None);
        let err = handle.shutdown().await.unwrap_err();
        assert!(matches!(err, SessionError::Status { .. }));
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn dropping_handle_still_deletes() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/session/new")
            .with_status(200)
            .with_body(format!("\"{ID}\""))
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/session")
            .match_query(Matcher::Any)
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let mut handle = keep_alive(&server, 60_000).spawn();
        handle.wait_for_session().await.unwrap();
        drop(handle);

        tokio::time::sleep(Duration::from_millis(200)).await;
        delete.assert_async().await;
    }

    fn slow_open(server: &mut mockito::ServerGuard) -> mockito::Mock {
        server
            .mock("GET", "/session/new")
            .with_status(200)
            .with_chunked_body(|w| {
                std::thread::sleep(Duration::from_millis(300));
                w.write_all(format!("\"{ID}\"").as_bytes())
            })
            .expect(1)
    }

    #[tokio::test]
    async fn shutdown_during_open_deletes_issued_session() {
        let mut server = mockito::Server::new_async().await;
        let open = slow_open(&mut server).create_async().await;
        let ping = server
            .mock("GET", "/session/ping")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/session")
            .match_query(Matcher::UrlEncoded("session".into(), ID.into()))
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let handle = keep_alive(&server, 60_000).spawn();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(handle.session_id(), None);
        handle.shutdown().await.unwrap();

        open.assert_async().await;
        ping.assert_async().await;
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn dropping_handle_during_open_deletes_issued_session() {
        let mut server = mockito::Server::new_async().await;
        let _open = slow_open(&mut server).create_async().await;
        let delete = server
            .mock("DELETE", "/session")
            .match_query(Matcher::UrlEncoded("session".into(), ID.into()))
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let handle = keep_alive(&server, 60_000).spawn();
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(handle);

        tokio::time::sleep(Duration::from_millis(600)).await;
        delete.assert_async().await;
    }
}
