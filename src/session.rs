use chrono::{DateTime, FixedOffset};
use imap::types::Flag;
use imap::{ClientBuilder, Connection, ConnectionMode};

use crate::account::Account;
use crate::error::Result;

/// One fetched message together with the server-side metadata needed to
/// re-file it elsewhere.
#[derive(Debug, Clone)]
pub struct RawMessage {
    /// The full RFC 5322 byte stream.
    pub body: Vec<u8>,
    pub flags: Vec<Flag<'static>>,
    /// The server's `INTERNALDATE` for the message, if reported.
    pub internal_date: Option<DateTime<FixedOffset>>,
}

/// The operations a [`Client`](crate::Client) needs from an authenticated
/// IMAP session.
///
/// The production implementation wraps an [`imap::Session`]; substituting
/// another implementation (for tests, or for an exotic transport) is the
/// supported way to put a different remote end behind a `Client`. Message
/// identifiers are UIDs scoped to the currently selected folder.
pub trait MailSession {
    fn select(&mut self, folder: &str) -> Result<()>;
    /// Runs an IMAP `SEARCH` with the given criteria, returning matching
    /// UIDs in ascending order.
    fn search(&mut self, criteria: &str) -> Result<Vec<u32>>;
    /// Fetches the full message body without setting `\Seen`.
    fn fetch_body(&mut self, uid: u32) -> Result<Option<Vec<u8>>>;
    /// Fetches the full message body plus flags and internal date.
    fn fetch_message(&mut self, uid: u32) -> Result<Option<RawMessage>>;
    fn add_flags(&mut self, uid: u32, flags: &[Flag<'static>]) -> Result<()>;
    fn remove_flags(&mut self, uid: u32, flags: &[Flag<'static>]) -> Result<()>;
    fn move_message(&mut self, uid: u32, folder: &str) -> Result<()>;
    fn list_folders(&mut self) -> Result<Vec<String>>;
    fn create_folder(&mut self, folder: &str) -> Result<()>;
    /// Appends a message, preserving its flags and internal date.
    fn append(&mut self, folder: &str, message: &RawMessage) -> Result<()>;
    fn expunge(&mut self) -> Result<()>;
    fn logout(&mut self) -> Result<()>;
}

/// Connects and authenticates against the account's IMAP server.
pub(crate) fn dial(account: &Account) -> Result<Box<dyn MailSession>> {
    let mode = if account.use_tls {
        ConnectionMode::Tls
    } else {
        ConnectionMode::Plaintext
    };
    let client = ClientBuilder::new(account.server.as_str(), account.port)
        .mode(mode)
        .connect()?;
    let session = client
        .login(&account.username, &account.password)
        .map_err(|e| e.0)?;
    Ok(Box::new(ImapSession { session }))
}

/// [`MailSession`] backed by a live [`imap::Session`].
pub struct ImapSession {
    session: imap::Session<Connection>,
}

impl ImapSession {
    pub fn new(session: imap::Session<Connection>) -> ImapSession {
        ImapSession { session }
    }
}

impl MailSession for ImapSession {
    fn select(&mut self, folder: &str) -> Result<()> {
        self.session.select(folder)?;
        Ok(())
    }

    fn search(&mut self, criteria: &str) -> Result<Vec<u32>> {
        let uids = self.session.uid_search(criteria)?;
        let mut uids: Vec<u32> = uids.into_iter().collect();
        uids.sort_unstable();
        Ok(uids)
    }

    fn fetch_body(&mut self, uid: u32) -> Result<Option<Vec<u8>>> {
        let fetches = self.session.uid_fetch(uid.to_string(), "(BODY.PEEK[] UID)")?;
        Ok(fetches
            .iter()
            .find_map(|fetch| fetch.body().map(|body| body.to_vec())))
    }

    fn fetch_message(&mut self, uid: u32) -> Result<Option<RawMessage>> {
        let fetches = self
            .session
            .uid_fetch(uid.to_string(), "(BODY.PEEK[] FLAGS INTERNALDATE UID)")?;
        let fetch = match fetches.iter().find(|fetch| fetch.body().is_some()) {
            Some(fetch) => fetch,
            None => return Ok(None),
        };
        Ok(Some(RawMessage {
            body: fetch.body().unwrap_or_default().to_vec(),
            flags: fetch.flags().iter().map(owned_flag).collect(),
            internal_date: fetch.internal_date(),
        }))
    }

    fn add_flags(&mut self, uid: u32, flags: &[Flag<'static>]) -> Result<()> {
        self.session
            .uid_store(uid.to_string(), format!("+FLAGS ({})", flag_list(flags)))?;
        Ok(())
    }

    fn remove_flags(&mut self, uid: u32, flags: &[Flag<'static>]) -> Result<()> {
        self.session
            .uid_store(uid.to_string(), format!("-FLAGS ({})", flag_list(flags)))?;
        Ok(())
    }

    fn move_message(&mut self, uid: u32, folder: &str) -> Result<()> {
        self.session.uid_mv(uid.to_string(), folder)?;
        Ok(())
    }

    fn list_folders(&mut self) -> Result<Vec<String>> {
        let names = self.session.list(None, Some("*"))?;
        Ok(names.iter().map(|name| name.name().to_string()).collect())
    }

    fn create_folder(&mut self, folder: &str) -> Result<()> {
        self.session.create(folder)?;
        Ok(())
    }

    fn append(&mut self, folder: &str, message: &RawMessage) -> Result<()> {
        // \Recent is session-only and cannot be set through APPEND.
        let flags: Vec<Flag<'static>> = message
            .flags
            .iter()
            .filter(|flag| !matches!(flag, Flag::Recent))
            .cloned()
            .collect();
        let mut binding = self.session.append(folder, &message.body);
        let cmd = binding.flags(flags);
        let cmd = match message.internal_date {
            Some(date) => cmd.internal_date(date),
            None => cmd,
        };
        cmd.finish()?;
        Ok(())
    }

    fn expunge(&mut self) -> Result<()> {
        self.session.expunge()?;
        Ok(())
    }

    fn logout(&mut self) -> Result<()> {
        self.session.logout()?;
        Ok(())
    }
}

fn owned_flag(flag: &Flag<'_>) -> Flag<'static> {
    match flag {
        Flag::Seen => Flag::Seen,
        Flag::Answered => Flag::Answered,
        Flag::Flagged => Flag::Flagged,
        Flag::Deleted => Flag::Deleted,
        Flag::Draft => Flag::Draft,
        Flag::Recent => Flag::Recent,
        Flag::MayCreate => Flag::MayCreate,
        other => Flag::Custom(other.to_string().into()),
    }
}

fn flag_list(flags: &[Flag<'static>]) -> String {
    flags
        .iter()
        .map(|flag| flag.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
