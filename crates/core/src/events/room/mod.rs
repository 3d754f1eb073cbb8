//! Content types for the `m.room.*` events the engine understands.

pub mod create;
pub mod member;
pub mod message;
pub mod name;
pub mod power_levels;
pub mod redaction;
pub mod topic;
