mod connection;
mod session;

pub use connection::Connection;
pub use session::{AppContext, Session};
