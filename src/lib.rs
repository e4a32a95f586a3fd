pub mod auth;
pub mod config;
pub mod crypto;
pub mod engine;
pub mod identity;
pub mod limits;
pub mod mailer;
pub mod maintenance;
pub mod model;
pub mod notify;
pub mod observability;
pub mod pictures;
pub mod seed;
pub mod sql;
pub mod tls;
pub mod venue;
pub mod wal;
pub mod wire;
