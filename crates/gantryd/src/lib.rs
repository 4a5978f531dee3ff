//! gantryd internals: demo applications, the per-connection driver and
//! the TCP server.

pub mod apps;
pub mod connection;
pub mod server;

pub use apps::AppKind;
pub use connection::{ConnectionContext, serve_connection};
pub use server::GatewayServer;
