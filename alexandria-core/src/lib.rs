//! The enrichment core: capability providers, the orchestrators that fall
//! back across them, the queue consumers and harvest workflow built on top,
//! and the Postgres/Redis/object-storage adapters everything writes
//! through. `alexandria-server` wires this crate's pieces to HTTP handlers
//! and owns process startup; nothing in this crate binds a socket.

pub mod analytics;
pub mod dedup;
pub mod error;
pub mod http_client;
pub mod orchestrators;
pub mod persistence;
pub mod providers;
pub mod quality;
pub mod queue;
pub mod quota;
pub mod registry;
pub mod service_context;
pub mod workflow;
