// Line-oriented TCP front end: framing, command decoding, per-connection
// handler and the acceptor.

pub mod codec;
pub mod handler;
pub mod server;

pub use codec::{Command, Frame, LineFramer, Response};
pub use handler::handle_connection;
pub use server::{serve, LineServer};
