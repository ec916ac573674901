//! High-level mailbox chores over IMAP and SMTP.
//!
//! This crate is a thin convenience layer for scripts and services that need
//! to read a mailbox, pick messages apart, and file or forward them. The wire
//! protocols are delegated entirely to [`imap`](https://docs.rs/imap) and
//! [`lettre`](https://docs.rs/lettre); MIME parsing is delegated to
//! [`mailparse`](https://docs.rs/mailparse). What this crate adds is the
//! glue: a [`Client`] that owns one blocking IMAP session and exposes the
//! operations a mail-processing script actually wants, and a [`Message`]
//! model that turns raw RFC 5322 bytes into headers, bodies, and decoded
//! attachments.
//!
//! Operations never panic and never return raw protocol errors. Failures are
//! reported as `bool`/`Option`/empty results and routed through an injected
//! [`LogSink`], so a processing loop can keep running no matter what a single
//! message does.
//!
//! # Usage
//!
//! ```no_run
//! use mailroom::{Account, Client};
//!
//! let account = Account::new(
//!     "Work",
//!     "imap.example.com",
//!     "user@example.com",
//!     "hunter2",
//!     993,
//!     true,
//! );
//! let mut client = Client::new(account);
//!
//! if client.connect() {
//!     for (id, message) in client.unread() {
//!         println!("{}: {} ({})", id, message.subject, message.from_address);
//!         for attachment in &message.attachments {
//!             client.save_attachment(attachment, "downloads".as_ref(), true);
//!         }
//!         client.set_read(&id, true);
//!     }
//!     client.disconnect();
//! }
//! ```

mod account;
mod client;
mod compose;
mod message;
mod session;

pub mod error;
pub mod logger;

pub use account::Account;
pub use client::{Client, Draft, Forward};
pub use error::{Error, Result};
pub use logger::{LogSink, StdLog};
pub use message::{replace_headers, Attachment, Message};
pub use session::{ImapSession, MailSession, RawMessage};

#[cfg(test)]
mod mock_session;
