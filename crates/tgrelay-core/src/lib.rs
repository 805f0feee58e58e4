//! # tgrelay-core
//!
//! Foundation types shared by every tgrelay crate:
//!
//! - [`Value`]: the closed set of value kinds a handler may return
//! - [`Encode`]: explicit mapping of domain types onto [`Value`]
//! - [`encode()`]: the recursive JSON encoder used for response envelopes
//! - [`logging`]: `tracing` subscriber setup

#![deny(unsafe_code)]

pub mod encode;
pub mod logging;
pub mod value;

pub use encode::{encode, to_json};
pub use value::{Bytes, Encode, Fields, Record, Value};
