//! Error types used throughout the crate.
//!
//! These errors are internal plumbing: every public [`Client`](crate::Client)
//! operation reports failure through its return value and the configured
//! [`LogSink`](crate::LogSink) rather than propagating one of these across
//! the API boundary.

use std::error::Error as StdError;
use std::fmt;
use std::io::Error as IoError;
use std::result;

use lettre::address::AddressError;
use lettre::error::Error as EmailError;
use lettre::transport::smtp::Error as SmtpError;
use mailparse::MailParseError;

/// A convenience wrapper around `Result` for `mailroom::error::Error`.
pub type Result<T> = result::Result<T, Error>;

/// A set of errors that can occur while driving a mailbox session.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// An `io::Error` that occurred while talking to a server or the
    /// filesystem.
    Io(IoError),
    /// An error reported by the underlying IMAP session.
    Imap(imap::Error),
    /// An error from the SMTP transport while sending an outbound message.
    Smtp(SmtpError),
    /// An outbound message could not be assembled.
    Build(EmailError),
    /// An address could not be parsed into a mailbox.
    Address(AddressError),
    /// A message could not be parsed as MIME.
    ParseMail(MailParseError),
    /// A stateful operation was invoked without an active session.
    NotConnected,
    /// A message identifier was not the string form of a numeric handle.
    BadMessageId(String),
    /// The destination folder did not exist and could not be created.
    CreateFolder(String),
    /// A message expected on the server was not returned by a fetch.
    MissingMessage(u32),
}

impl From<IoError> for Error {
    fn from(err: IoError) -> Error {
        Error::Io(err)
    }
}

impl From<imap::Error> for Error {
    fn from(err: imap::Error) -> Error {
        Error::Imap(err)
    }
}

impl From<SmtpError> for Error {
    fn from(err: SmtpError) -> Error {
        Error::Smtp(err)
    }
}

impl From<EmailError> for Error {
    fn from(err: EmailError) -> Error {
        Error::Build(err)
    }
}

impl From<AddressError> for Error {
    fn from(err: AddressError) -> Error {
        Error::Address(err)
    }
}

impl From<MailParseError> for Error {
    fn from(err: MailParseError) -> Error {
        Error::ParseMail(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => fmt::Display::fmt(e, f),
            Error::Imap(e) => fmt::Display::fmt(e, f),
            Error::Smtp(e) => fmt::Display::fmt(e, f),
            Error::Build(e) => fmt::Display::fmt(e, f),
            Error::Address(e) => fmt::Display::fmt(e, f),
            Error::ParseMail(e) => fmt::Display::fmt(e, f),
            Error::NotConnected => f.write_str("not connected to IMAP server"),
            Error::BadMessageId(id) => write!(f, "message id {:?} is not numeric", id),
            Error::CreateFolder(folder) => {
                write!(f, "could not create folder {:?}", folder)
            }
            Error::MissingMessage(uid) => {
                write!(f, "server returned no data for message {}", uid)
            }
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Imap(e) => Some(e),
            Error::Smtp(e) => Some(e),
            Error::Build(e) => Some(e),
            Error::Address(e) => Some(e),
            Error::ParseMail(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_connected_display() {
        assert_eq!(
            Error::NotConnected.to_string(),
            "not connected to IMAP server"
        );
    }

    #[test]
    fn bad_message_id_display() {
        let err = Error::BadMessageId("abc".into());
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn io_error_has_source() {
        let err = Error::from(IoError::new(std::io::ErrorKind::Other, "boom"));
        assert!(err.source().is_some());
    }
}
