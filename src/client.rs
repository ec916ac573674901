use std::fs;
use std::path::{Path, PathBuf};

use imap::types::Flag;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{SmtpTransport, Transport};

use crate::account::Account;
use crate::compose::{self, Outbound};
use crate::error::{Error, Result};
use crate::logger::{LogSink, StdLog};
use crate::message::{replace_headers, Attachment, Message};
use crate::session::{self, MailSession, RawMessage};

const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_DRAFT_FOLDER: &str = "Drafts";

/// A client for one IMAP account.
///
/// A `Client` owns at most one live session and moves between exactly two
/// states: disconnected and connected. Every operation is a blocking round
/// trip against the server. Operations report failure through their return
/// value and the configured [`LogSink`]; none of them panic or surface a raw
/// protocol error, so a processing loop over many messages can simply keep
/// going.
///
/// Message identifiers are the string form of server-assigned UIDs and are
/// only valid relative to the folder that was selected when they were
/// obtained; reselect (e.g. via [`search`](Client::search)) before reusing
/// ids across folders.
///
/// A single `Client` makes no thread-safety promises; callers that want
/// parallelism should run one `Client` per thread, each with its own
/// session.
pub struct Client {
    account: Account,
    logger: Box<dyn LogSink>,
    session: Option<Box<dyn MailSession>>,
}

impl Client {
    /// Creates a disconnected client that logs through the `log` crate.
    pub fn new(account: Account) -> Client {
        Client::with_logger(account, Box::new(StdLog))
    }

    /// Creates a disconnected client with an injected logging sink.
    pub fn with_logger(account: Account, logger: Box<dyn LogSink>) -> Client {
        Client {
            account,
            logger,
            session: None,
        }
    }

    /// Creates a client that is already connected over the given session.
    ///
    /// This constructor primarily exists so tests and alternate transports
    /// can put their own [`MailSession`] implementation behind a client.
    pub fn with_session(
        account: Account,
        session: Box<dyn MailSession>,
        logger: Box<dyn LogSink>,
    ) -> Client {
        Client {
            account,
            logger,
            session: Some(session),
        }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Connects to the IMAP server and authenticates.
    ///
    /// Returns `true` on success. On failure the error is logged and the
    /// client stays disconnected. Calling `connect` on an already connected
    /// client is a no-op that returns `true`.
    pub fn connect(&mut self) -> bool {
        if self.session.is_some() {
            self.logger.debug(&format!(
                "already connected to {}, reusing session",
                self.account.server
            ));
            return true;
        }
        self.logger.info(&format!(
            "connecting to {} for account {}",
            self.account.server, self.account.name
        ));
        match session::dial(&self.account) {
            Ok(session) => {
                self.logger
                    .info(&format!("successfully connected to {}", self.account.server));
                self.session = Some(session);
                true
            }
            Err(e) => {
                self.logger.error(&format!(
                    "failed to connect to {}: {}",
                    self.account.server, e
                ));
                false
            }
        }
    }

    /// Logs out and drops the session.
    ///
    /// Safe to call at any time, including on an already disconnected
    /// client. A logout failure is logged and otherwise ignored; the session
    /// handle is always cleared.
    pub fn disconnect(&mut self) {
        if let Some(mut session) = self.session.take() {
            match session.logout() {
                Ok(()) => self
                    .logger
                    .info(&format!("disconnected from {}", self.account.server)),
                Err(e) => self.logger.error(&format!(
                    "error disconnecting from {}: {}",
                    self.account.server, e
                )),
            }
        }
    }

    /// Searches a folder and fetches every matching message.
    ///
    /// `criteria` is an IMAP search expression such as `UNSEEN` or
    /// `SUBJECT "invoice" UNSEEN`; when `None`, unread messages are
    /// returned. A message that fails to fetch or parse is logged and
    /// skipped without aborting the batch.
    pub fn search(&mut self, criteria: Option<&str>, folder: &str) -> Vec<(String, Message)> {
        let logger = self.logger.as_ref();
        let session = match self.session.as_mut() {
            Some(session) => session,
            None => {
                logger.error(&Error::NotConnected.to_string());
                return Vec::new();
            }
        };
        let criteria = criteria.unwrap_or("UNSEEN");

        if let Err(e) = session.select(folder) {
            logger.error(&format!("error selecting folder '{}': {}", folder, e));
            return Vec::new();
        }
        logger.info(&format!("searching for messages with criteria: {}", criteria));
        let uids = match session.search(criteria) {
            Ok(uids) => uids,
            Err(e) => {
                logger.error(&format!("error searching for messages: {}", e));
                return Vec::new();
            }
        };
        if uids.is_empty() {
            logger.info("no messages found");
            return Vec::new();
        }
        logger.info(&format!("found {} messages", uids.len()));

        let mut messages = Vec::with_capacity(uids.len());
        for uid in uids {
            let raw = match session.fetch_body(uid) {
                Ok(Some(raw)) => raw,
                Ok(None) => {
                    logger.error(&Error::MissingMessage(uid).to_string());
                    continue;
                }
                Err(e) => {
                    logger.error(&format!("error fetching message {}: {}", uid, e));
                    continue;
                }
            };
            match Message::from_bytes(&uid.to_string(), raw, logger) {
                Ok(message) => messages.push((uid.to_string(), message)),
                Err(e) => logger.error(&format!("error parsing message {}: {}", uid, e)),
            }
        }
        messages
    }

    /// All unread messages in the inbox.
    pub fn unread(&mut self) -> Vec<(String, Message)> {
        self.search(Some("UNSEEN"), "INBOX")
    }

    /// Every message in the given folder.
    pub fn all(&mut self, folder: &str) -> Vec<(String, Message)> {
        self.search(Some("ALL"), folder)
    }

    /// Adds or removes the `\Seen` flag on one message.
    pub fn set_read(&mut self, id: &str, read: bool) -> bool {
        let logger = self.logger.as_ref();
        let session = match self.session.as_mut() {
            Some(session) => session,
            None => {
                logger.error(&Error::NotConnected.to_string());
                return false;
            }
        };
        let Some(uid) = parse_uid(logger, id) else {
            return false;
        };
        let result = if read {
            session.add_flags(uid, &[Flag::Seen])
        } else {
            session.remove_flags(uid, &[Flag::Seen])
        };
        match result {
            Ok(()) => {
                logger.info(&format!(
                    "marked message {} as {}",
                    id,
                    if read { "read" } else { "unread" }
                ));
                true
            }
            Err(e) => {
                logger.error(&format!("error marking message {}: {}", id, e));
                false
            }
        }
    }

    /// Moves a message to another folder, creating the folder if necessary.
    ///
    /// An empty destination is not an error: the call succeeds without doing
    /// anything, so configuration with an optional "move processed mail to"
    /// folder can pass it straight through.
    pub fn move_message(&mut self, id: &str, folder: &str) -> bool {
        let logger = self.logger.as_ref();
        let session = match self.session.as_mut() {
            Some(session) => session,
            None => {
                logger.error(&Error::NotConnected.to_string());
                return false;
            }
        };
        if folder.is_empty() {
            logger.debug(&format!(
                "no destination folder for message {}, skipping move",
                id
            ));
            return true;
        }
        let Some(uid) = parse_uid(logger, id) else {
            return false;
        };
        if !ensure_folder(&mut **session, logger, folder) {
            return false;
        }
        match session.move_message(uid, folder) {
            Ok(()) => {
                logger.info(&format!("moved message {} to folder '{}'", id, folder));
                true
            }
            Err(e) => {
                logger.error(&format!(
                    "error moving message {} to folder '{}': {}",
                    id, folder, e
                ));
                false
            }
        }
    }

    /// Moves a message while rewriting some of its headers.
    ///
    /// The message is fetched in full, each named header is replaced, and
    /// the rewritten bytes are appended to the destination with the original
    /// flags and internal date preserved. The original is deleted only once
    /// the append has succeeded; if the append fails, the mailbox is left
    /// exactly as it was.
    pub fn move_with_headers(
        &mut self,
        id: &str,
        folder: &str,
        headers: &[(String, String)],
    ) -> bool {
        let logger = self.logger.as_ref();
        let session = match self.session.as_mut() {
            Some(session) => session,
            None => {
                logger.error(&Error::NotConnected.to_string());
                return false;
            }
        };
        if folder.is_empty() {
            logger.debug(&format!(
                "no destination folder for message {}, skipping move",
                id
            ));
            return true;
        }
        let Some(uid) = parse_uid(logger, id) else {
            return false;
        };

        let original = match session.fetch_message(uid) {
            Ok(Some(message)) => message,
            Ok(None) => {
                logger.error(&Error::MissingMessage(uid).to_string());
                return false;
            }
            Err(e) => {
                logger.error(&format!("error fetching message {}: {}", id, e));
                return false;
            }
        };
        let rewritten = RawMessage {
            body: replace_headers(&original.body, headers),
            flags: original.flags,
            internal_date: original.internal_date,
        };

        if !ensure_folder(&mut **session, logger, folder) {
            return false;
        }
        if let Err(e) = session.append(folder, &rewritten) {
            logger.error(&format!(
                "error appending message {} to '{}', original left in place: {}",
                id, folder, e
            ));
            return false;
        }
        if let Err(e) = session.add_flags(uid, &[Flag::Deleted]) {
            logger.warning(&format!(
                "message {} copied to '{}' but the original could not be deleted: {}",
                id, folder, e
            ));
            return true;
        }
        if let Err(e) = session.expunge() {
            logger.warning(&format!(
                "message {} copied to '{}' but expunge failed: {}",
                id, folder, e
            ));
            return true;
        }
        logger.info(&format!(
            "moved message {} to folder '{}' with {} rewritten headers",
            id,
            folder,
            headers.len()
        ));
        true
    }

    /// Marks a message deleted and expunges it.
    pub fn delete(&mut self, id: &str) -> bool {
        let logger = self.logger.as_ref();
        let session = match self.session.as_mut() {
            Some(session) => session,
            None => {
                logger.error(&Error::NotConnected.to_string());
                return false;
            }
        };
        let Some(uid) = parse_uid(logger, id) else {
            return false;
        };
        if let Err(e) = session.add_flags(uid, &[Flag::Deleted]) {
            logger.error(&format!("error deleting message {}: {}", id, e));
            return false;
        }
        if let Err(e) = session.expunge() {
            logger.error(&format!("error expunging after deleting {}: {}", id, e));
            return false;
        }
        logger.info(&format!("deleted message {}", id));
        true
    }

    /// Lists all folders in the mailbox.
    pub fn list_folders(&mut self) -> Vec<String> {
        let logger = self.logger.as_ref();
        let session = match self.session.as_mut() {
            Some(session) => session,
            None => {
                logger.error(&Error::NotConnected.to_string());
                return Vec::new();
            }
        };
        match session.list_folders() {
            Ok(folders) => folders,
            Err(e) => {
                logger.error(&format!("error listing folders: {}", e));
                Vec::new()
            }
        }
    }

    /// Writes an attachment's decoded bytes to disk and returns the final
    /// path, or `None` on failure.
    ///
    /// When `target` is a directory (or has no file extension) the
    /// attachment's own filename is used, with path separators replaced by
    /// underscores when `sanitize` is set. Parent directories are created as
    /// needed. An existing file is never overwritten; colliding names get a
    /// numeric suffix (`report_1.pdf`, `report_2.pdf`, ...).
    pub fn save_attachment(
        &self,
        attachment: &Attachment,
        target: &Path,
        sanitize: bool,
    ) -> Option<PathBuf> {
        match save_attachment_inner(attachment, target, sanitize, self.logger.as_ref()) {
            Ok(path) => {
                self.logger
                    .info(&format!("saved attachment to {}", path.display()));
                Some(path)
            }
            Err(e) => {
                self.logger.error(&format!(
                    "error saving attachment {}: {}",
                    attachment.filename, e
                ));
                None
            }
        }
    }

    /// Fetches messages and runs a callback over each, connecting first and
    /// disconnecting afterwards.
    ///
    /// The callback returns `Ok(true)` when it handled the message, in
    /// which case the message is counted and, when requested, marked read
    /// and moved to `move_to`. A callback error is logged and processing
    /// continues with the remaining messages. Returns the number of handled
    /// messages.
    pub fn process_with_callback<F>(
        &mut self,
        mut callback: F,
        criteria: Option<&str>,
        folder: &str,
        mark_read: bool,
        move_to: Option<&str>,
    ) -> usize
    where
        F: FnMut(&Message) -> std::result::Result<bool, Box<dyn std::error::Error>>,
    {
        if !self.connect() {
            return 0;
        }
        let messages = self.search(criteria, folder);
        let mut processed = 0;
        for (id, message) in &messages {
            match callback(message) {
                Ok(true) => {
                    processed += 1;
                    if mark_read {
                        self.set_read(id, true);
                    }
                    if let Some(destination) = move_to {
                        self.move_message(id, destination);
                    }
                }
                Ok(false) => {}
                Err(e) => self
                    .logger
                    .error(&format!("error processing message {}: {}", id, e)),
            }
        }
        self.disconnect();
        processed
    }

    /// Starts forwarding a message over SMTP.
    ///
    /// The returned builder is preloaded with the account's credentials and
    /// sensible defaults; call [`send`](Forward::send) to deliver.
    pub fn forward<'a>(&'a self, message: &'a Message, to: &[&str]) -> Forward<'a> {
        Forward {
            client: self,
            message,
            to: to.iter().map(|s| s.to_string()).collect(),
            subject: None,
            smtp_server: None,
            smtp_port: DEFAULT_SMTP_PORT,
            smtp_username: None,
            smtp_password: None,
            sender: None,
            bcc: Vec::new(),
            headers: Vec::new(),
            additional_text: String::new(),
        }
    }

    /// Starts composing a draft to be stored on the server.
    ///
    /// Call [`save`](Draft::save) to store it as a new draft, or
    /// [`replace`](Draft::replace) to swap it in for an existing one.
    pub fn draft<'a>(&'a mut self, to: &[&str], subject: &str, body: &str) -> Draft<'a> {
        Draft {
            client: self,
            to: to.iter().map(|s| s.to_string()).collect(),
            subject: subject.to_string(),
            body: body.to_string(),
            from: None,
            cc: Vec::new(),
            bcc: Vec::new(),
            headers: Vec::new(),
            content_type: "text/plain".to_string(),
            attachments: Vec::new(),
            folder: DEFAULT_DRAFT_FOLDER.to_string(),
        }
    }
}

fn parse_uid(logger: &dyn LogSink, id: &str) -> Option<u32> {
    match id.trim().parse() {
        Ok(uid) => Some(uid),
        Err(_) => {
            logger.error(&Error::BadMessageId(id.to_string()).to_string());
            None
        }
    }
}

fn ensure_folder(session: &mut dyn MailSession, logger: &dyn LogSink, folder: &str) -> bool {
    match session.list_folders() {
        Ok(folders) if folders.iter().any(|name| name == folder) => true,
        Ok(_) => {
            logger.warning(&format!(
                "folder '{}' does not exist, attempting to create it",
                folder
            ));
            match session.create_folder(folder) {
                Ok(()) => {
                    logger.info(&format!("created folder '{}'", folder));
                    true
                }
                Err(e) => {
                    logger.error(&format!(
                        "{}: {}",
                        Error::CreateFolder(folder.to_string()),
                        e
                    ));
                    false
                }
            }
        }
        Err(e) => {
            logger.error(&format!("error listing folders: {}", e));
            false
        }
    }
}

fn save_attachment_inner(
    attachment: &Attachment,
    target: &Path,
    sanitize: bool,
    logger: &dyn LogSink,
) -> std::io::Result<PathBuf> {
    let path = if target.is_dir() || target.extension().is_none() {
        fs::create_dir_all(target)?;
        let mut filename = attachment.filename.clone();
        if sanitize {
            let cleaned = filename.replace(['/', '\\'], "_");
            if cleaned != filename {
                logger.debug(&format!(
                    "sanitized filename {:?} -> {:?}",
                    filename, cleaned
                ));
            }
            filename = cleaned;
        }
        target.join(filename)
    } else {
        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        target.to_path_buf()
    };

    let original = path.clone();
    let mut path = path;
    let mut counter = 1;
    while path.exists() {
        let stem = original
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let suffixed = match original.extension() {
            Some(ext) => format!("{}_{}.{}", stem, counter, ext.to_string_lossy()),
            None => format!("{}_{}", stem, counter),
        };
        path = original.with_file_name(suffixed);
        counter += 1;
    }

    fs::write(&path, &attachment.data)?;
    Ok(path)
}

/// Best-effort guess at the SMTP host that pairs with an IMAP host.
///
/// `imap.example.com` becomes `smtp.example.com`. The substitution is purely
/// textual and deliberately naive; callers with differently named servers
/// should pass one explicitly.
fn derive_smtp_server(imap_server: &str) -> String {
    imap_server.replace("imap", "smtp")
}

/// A pending forward, created by [`Client::forward`].
///
/// Unset options fall back to the owning account: SMTP credentials and the
/// sender address default to the IMAP login, and the SMTP host is guessed by
/// substituting `imap` with `smtp` in the IMAP server name.
pub struct Forward<'a> {
    client: &'a Client,
    message: &'a Message,
    to: Vec<String>,
    subject: Option<String>,
    smtp_server: Option<String>,
    smtp_port: u16,
    smtp_username: Option<String>,
    smtp_password: Option<String>,
    sender: Option<String>,
    bcc: Vec<String>,
    headers: Vec<(String, String)>,
    additional_text: String,
}

impl<'a> Forward<'a> {
    /// Overrides the subject; defaults to `Fwd: ` plus the original subject.
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn smtp_server(mut self, server: impl Into<String>) -> Self {
        self.smtp_server = Some(server.into());
        self
    }

    /// Overrides the SMTP port; defaults to 587.
    pub fn smtp_port(mut self, port: u16) -> Self {
        self.smtp_port = port;
        self
    }

    pub fn smtp_username(mut self, username: impl Into<String>) -> Self {
        self.smtp_username = Some(username.into());
        self
    }

    pub fn smtp_password(mut self, password: impl Into<String>) -> Self {
        self.smtp_password = Some(password.into());
        self
    }

    /// Overrides the `From` address; defaults to the account's username.
    pub fn sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn bcc(mut self, address: impl Into<String>) -> Self {
        self.bcc.push(address.into());
        self
    }

    /// Adds a custom header, replacing any header of the same name the
    /// assembled message would otherwise carry.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Text to prepend above the forwarded-message block.
    pub fn additional_text(mut self, text: impl Into<String>) -> Self {
        self.additional_text = text.into();
        self
    }

    /// Builds and sends the forward over SMTP with STARTTLS.
    ///
    /// Returns `true` on success; failures are logged.
    pub fn send(self) -> bool {
        match self.send_inner() {
            Ok(()) => {
                self.client.logger.info(&format!(
                    "forwarded message {} to {}",
                    self.message.id,
                    self.to.join(", ")
                ));
                true
            }
            Err(e) => {
                self.client.logger.error(&format!(
                    "error forwarding message {}: {}",
                    self.message.id, e
                ));
                false
            }
        }
    }

    fn build_email(&self) -> Result<lettre::Message> {
        let account = &self.client.account;
        let sender = self
            .sender
            .clone()
            .unwrap_or_else(|| account.username.clone());
        let subject = self
            .subject
            .clone()
            .unwrap_or_else(|| format!("Fwd: {}", self.message.subject));
        let text = compose::forward_text(self.message, &self.additional_text);
        let html = self
            .message
            .body("text/html")
            .map(|html| compose::forward_html(self.message, &self.additional_text, &html));
        compose::build(&Outbound {
            from: &sender,
            to: &self.to,
            cc: &[],
            bcc: &self.bcc,
            subject: &subject,
            text: Some(text),
            html,
            attachments: &self.message.attachments,
        })
    }

    fn send_inner(&self) -> Result<()> {
        let account = &self.client.account;
        let email = self.build_email()?;
        let server = self
            .smtp_server
            .clone()
            .unwrap_or_else(|| derive_smtp_server(&account.server));
        let username = self
            .smtp_username
            .clone()
            .unwrap_or_else(|| account.username.clone());
        let password = self
            .smtp_password
            .clone()
            .unwrap_or_else(|| account.password.clone());
        let mailer = SmtpTransport::starttls_relay(&server)?
            .port(self.smtp_port)
            .credentials(Credentials::new(username, password))
            .build();
        if self.headers.is_empty() {
            mailer.send(&email)?;
        } else {
            let bytes = replace_headers(&email.formatted(), &self.headers);
            mailer.send_raw(&email.envelope(), &bytes)?;
        }
        Ok(())
    }
}

/// A pending draft, created by [`Client::draft`].
pub struct Draft<'a> {
    client: &'a mut Client,
    to: Vec<String>,
    subject: String,
    body: String,
    from: Option<String>,
    cc: Vec<String>,
    bcc: Vec<String>,
    headers: Vec<(String, String)>,
    content_type: String,
    attachments: Vec<Attachment>,
    folder: String,
}

impl<'a> Draft<'a> {
    /// Overrides the `From` address; defaults to the account's username.
    pub fn from(mut self, address: impl Into<String>) -> Self {
        self.from = Some(address.into());
        self
    }

    pub fn cc(mut self, address: impl Into<String>) -> Self {
        self.cc.push(address.into());
        self
    }

    pub fn bcc(mut self, address: impl Into<String>) -> Self {
        self.bcc.push(address.into());
        self
    }

    /// Adds a custom header, replacing any header of the same name the
    /// assembled message would otherwise carry.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the body content type, `text/plain` by default. Pass
    /// `text/html` to store an HTML draft.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Stores the draft in a different folder than `Drafts`.
    pub fn folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = folder.into();
        self
    }

    /// Appends the draft to the draft folder (creating the folder if
    /// needed) with the `\Draft` flag set.
    pub fn save(self) -> bool {
        let bytes = match self.build_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                self.client
                    .logger
                    .error(&format!("error building draft: {}", e));
                return false;
            }
        };
        let logger = self.client.logger.as_ref();
        let session = match self.client.session.as_mut() {
            Some(session) => session,
            None => {
                logger.error(&Error::NotConnected.to_string());
                return false;
            }
        };
        if !ensure_folder(&mut **session, logger, &self.folder) {
            return false;
        }
        let draft = RawMessage {
            body: bytes,
            flags: vec![Flag::Draft],
            internal_date: None,
        };
        match session.append(&self.folder, &draft) {
            Ok(()) => {
                logger.info(&format!(
                    "saved draft '{}' to folder '{}'",
                    self.subject, self.folder
                ));
                true
            }
            Err(e) => {
                logger.error(&format!(
                    "error saving draft to folder '{}': {}",
                    self.folder, e
                ));
                false
            }
        }
    }

    /// Replaces an existing draft with this one.
    ///
    /// The new draft is saved first; only then is the old one deleted. If
    /// saving fails the old draft is left intact and the call reports
    /// failure. If saving succeeds but the old draft cannot be deleted, the
    /// call still reports success, since the updated content is in place;
    /// the stale duplicate is logged.
    pub fn replace(self, id: &str) -> bool {
        let bytes = match self.build_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                self.client
                    .logger
                    .error(&format!("error building draft: {}", e));
                return false;
            }
        };
        let logger = self.client.logger.as_ref();
        let Some(uid) = parse_uid(logger, id) else {
            return false;
        };
        let session = match self.client.session.as_mut() {
            Some(session) => session,
            None => {
                logger.error(&Error::NotConnected.to_string());
                return false;
            }
        };
        if let Err(e) = session.select(&self.folder) {
            logger.error(&format!(
                "error selecting draft folder '{}': {}",
                self.folder, e
            ));
            return false;
        }
        match session.fetch_message(uid) {
            Ok(Some(old)) => {
                if !old.flags.contains(&Flag::Draft) {
                    logger.warning(&format!(
                        "message {} in '{}' is not flagged as a draft, replacing anyway",
                        id, self.folder
                    ));
                }
            }
            Ok(None) => {
                logger.error(&format!(
                    "draft {} not found in folder '{}'",
                    id, self.folder
                ));
                return false;
            }
            Err(e) => {
                logger.error(&format!("error fetching draft {}: {}", id, e));
                return false;
            }
        }

        let draft = RawMessage {
            body: bytes,
            flags: vec![Flag::Draft],
            internal_date: None,
        };
        if let Err(e) = session.append(&self.folder, &draft) {
            logger.error(&format!(
                "error saving replacement draft, old draft {} left in place: {}",
                id, e
            ));
            return false;
        }
        if let Err(e) = session.add_flags(uid, &[Flag::Deleted]) {
            logger.warning(&format!(
                "replacement draft saved but old draft {} could not be deleted: {}",
                id, e
            ));
            return true;
        }
        if let Err(e) = session.expunge() {
            logger.warning(&format!(
                "replacement draft saved but expunge of {} failed: {}",
                id, e
            ));
            return true;
        }
        logger.info(&format!("updated draft {} in folder '{}'", id, self.folder));
        true
    }

    fn build_bytes(&self) -> Result<Vec<u8>> {
        let account = &self.client.account;
        let from = self.from.clone().unwrap_or_else(|| account.username.clone());
        let (text, html) = if self.content_type.eq_ignore_ascii_case("text/html") {
            (None, Some(self.body.clone()))
        } else {
            (Some(self.body.clone()), None)
        };
        let email = compose::build(&Outbound {
            from: &from,
            to: &self.to,
            cc: &self.cc,
            bcc: &self.bcc,
            subject: &self.subject,
            text,
            html,
            attachments: &self.attachments,
        })?;
        let mut bytes = email.formatted();
        if !self.headers.is_empty() {
            bytes = replace_headers(&bytes, &self.headers);
        }
        Ok(bytes)
    }
}
