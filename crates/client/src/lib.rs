//! A stateful Matrix client-server sync engine.
//!
//! The engine consumes incremental `/sync` responses and maintains a
//! consistent local view of rooms, their state, and their per-room
//! timelines. Timelines track discontinuities as explicit holes and
//! transparently backfill them through `/rooms/{room_id}/messages` during
//! traversal. Authentication failures are recovered by token refresh and
//! transparent replay of the failing request.
//!
//! ```no_run
//! use std::time::Duration;
//! use fluo::Client;
//!
//! # async fn run() -> fluo::Result<()> {
//! let client = Client::new("https://matrix.example.org".parse().unwrap());
//! client.password_login("alice", "secret", None, None).await?;
//!
//! client.sync(Duration::from_secs(30)).await?;
//! for room_id in client.joined_rooms() {
//!     println!("{room_id}: {:?}", client.room_display_name(&room_id));
//! }
//! # Ok(())
//! # }
//! ```

pub use fluo_core;

mod api;
mod client;
mod error;
mod http;
mod rooms;
mod session;
mod state;
mod sync;
mod timeline;

pub use self::client::{Client, CreateRoomOptions, TimelineHandle};
pub use self::error::{Error, Result};
pub use self::http::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
pub use self::session::{LoginData, Session};
pub use self::state::{
    fold_stripped, resolve, EventWithState, ResolvableEvent, StateKey, StateSnapshot,
};
pub use self::timeline::{Hole, TimelinePoint};
