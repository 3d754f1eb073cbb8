//! Request and response bodies for the client-server endpoints the engine
//! uses.

pub mod membership;
pub mod message;
pub mod redact;
pub mod room;
pub mod session;
pub mod sync_events;
