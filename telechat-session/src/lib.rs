//! Transport layer: a duplex byte stream to the remote BBS.
//!
//! [`Session`] is the seam the rest of the workspace talks to. Two
//! implementations ship here: [`TelnetSession`] over TCP, and
//! [`MemorySession`], a scripted in-memory stream used by tests.

mod errors;
mod memory;
mod negotiation;
mod session;
mod size;
mod telnet;

pub use crate::errors::SessionError;
pub use crate::memory::{MemoryConnector, MemorySession};
pub use crate::session::{ConnectTarget, Connector, ReadOutcome, Session};
pub use crate::size::SessionSize;
pub use crate::telnet::{TelnetConnector, TelnetSession, telnet};
