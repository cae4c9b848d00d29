//! Stream processing and connection handling for BBS teleconference
//! sessions.
//!
//! This crate sits between the lower-level building blocks of the workspace:
//! - [`telechat_session`] for Telnet transports,
//! - [`telechat_codec`] for CP437 decoding, ANSI span parsing and line
//!   assembly.
//!
//! The main entry points are:
//! - [`StreamProcessor`], which turns raw bytes into ordered
//!   [`DisplayEvent`]s while tracking room banners, action lists, chat and
//!   triggers.
//! - [`Client`], which owns a processor and a [`Connection`] and is ticked by
//!   the front-end.
//! - [`Store`], which persists chat history, members, triggers and settings
//!   as JSON documents.

mod actions;
mod banner;
mod classifier;
mod client;
mod connection;
mod error;
mod event;
mod logon;
mod options;
mod processor;
mod settings;
mod state;
pub mod storage;
mod trigger;

pub use actions::{ActionListMachine, ActionStep};
pub use banner::{BannerMachine, BannerStep, extract as extract_snapshot};
pub use classifier::{ChatEvent, ChatKind, Dialect, classify, classify_at};
pub use client::Client;
pub use connection::{Connection, ReaderMessage, connect_with_retry};
pub use error::{Error, Result};
pub use event::{ConnectionState, DisplayEvent, RoomSnapshot, SYSTEM_MEMBER};
pub use logon::{AutoLogon, DEFAULT_STEP_DELAY, LogonMessage, LogonStep};
pub use options::{
    ConnectionOptions, DEFAULT_ACTION_LIST_COMMAND, ProcessorOptions,
    ReconnectPolicy,
};
pub use processor::{Outbound, StreamProcessor};
pub use settings::{DEFAULT_PORT, Settings};
pub use state::SessionState;
pub use storage::{ChatLog, StorageError, Store};
pub use trigger::{Trigger, TriggerEngine};

pub use telechat_codec as codec;
pub use telechat_session as session;
