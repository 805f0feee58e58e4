//! Method registry, dispatcher, and handlers behind `/api/call`.

pub mod dispatch;
pub mod errors;
pub mod handlers;
pub mod registry;
pub mod types;
