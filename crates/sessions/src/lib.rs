//! Session lifecycle client.
//!
//! A session is a server-tracked liveness token identified by a UUID. The
//! client opens one (`GET <base>/new`), keeps it alive with periodic pings
//! (`GET <base>/ping?uuid=<id>`) and deletes it on shutdown
//! (`DELETE <base>?session=<id>`).

pub mod client;
pub mod error;
pub mod id;
pub mod keepalive;

pub use {
    client::SessionClient,
    error::{Result, SessionError},
    id::SessionId,
    keepalive::{KeepAlive, KeepAliveHandle},
};
