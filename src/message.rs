use std::fmt;

use mailparse::{DispositionType, MailHeaderMap, ParsedMail};
use ouroboros::self_referencing;

use crate::error::Result;
use crate::logger::LogSink;

/// One attachment extracted from, or destined for, a message.
///
/// `data` always holds the fully decoded payload; any base64 or
/// quoted-printable transfer encoding has already been reversed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    /// The declared content type, e.g. `application/pdf`.
    pub content_type: String,
    pub data: Vec<u8>,
    /// The `Content-ID` header value, if the part carried one.
    pub content_id: Option<String>,
    /// Whether the part is meant to be displayed inside an HTML body rather
    /// than offered as a download.
    pub is_inline: bool,
}

impl Attachment {
    /// Creates a regular (non-inline) attachment for an outbound message.
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Attachment {
        Attachment {
            filename: filename.into(),
            content_type: content_type.into(),
            data,
            content_id: None,
            is_inline: false,
        }
    }

    /// Marks this attachment as an inline part referenced by the given
    /// content id (with or without angle brackets).
    pub fn inline(mut self, content_id: impl Into<String>) -> Attachment {
        self.content_id = Some(content_id.into());
        self.is_inline = true;
        self
    }
}

// The parsed view borrows from the raw bytes it was parsed out of, so the
// two have to live in one self-referential struct for the Message to be an
// owned value.
#[self_referencing]
struct MimeTree {
    raw: Vec<u8>,
    #[borrows(raw)]
    #[covariant]
    parsed: ParsedMail<'this>,
}

/// A read-only snapshot of one fetched message.
///
/// A `Message` is never mutated after parsing; state changes such as the
/// read flag or the containing folder live on the server and are addressed
/// through the message id. The parsed MIME tree is retained internally so
/// [`body`](Message::body) can extract text by content type without
/// re-parsing.
pub struct Message {
    /// The server-assigned identifier, in string form. Identifiers are only
    /// meaningful within the folder that was selected when the message was
    /// fetched.
    pub id: String,
    /// The decoded `From` header, or the raw header text where RFC 2047
    /// decoding was not possible.
    pub from_address: String,
    /// The decoded `Subject` header.
    pub subject: String,
    /// The `Date` header exactly as the server delivered it.
    pub date: String,
    /// All attachments and inline images found in the message, in the order
    /// their parts appeared.
    pub attachments: Vec<Attachment>,
    tree: MimeTree,
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("id", &self.id)
            .field("from_address", &self.from_address)
            .field("subject", &self.subject)
            .field("date", &self.date)
            .field("attachments", &self.attachments.len())
            .finish()
    }
}

impl Message {
    /// Parses a raw RFC 5322 message, collecting headers and attachments.
    pub fn from_bytes(id: &str, raw: Vec<u8>, logger: &dyn LogSink) -> Result<Message> {
        Message::parse(id, raw, logger, true)
    }

    /// Like [`from_bytes`](Message::from_bytes), but skips the attachment
    /// walk. Useful when only the headers and body text matter.
    pub fn from_bytes_without_attachments(
        id: &str,
        raw: Vec<u8>,
        logger: &dyn LogSink,
    ) -> Result<Message> {
        Message::parse(id, raw, logger, false)
    }

    fn parse(
        id: &str,
        raw: Vec<u8>,
        logger: &dyn LogSink,
        include_attachments: bool,
    ) -> Result<Message> {
        logger.debug(&format!("parsing message {}", id));
        let tree = MimeTreeTryBuilder {
            raw,
            parsed_builder: |raw: &Vec<u8>| mailparse::parse_mail(raw),
        }
        .try_build()?;

        let (from_address, subject, date, attachments) = tree.with_parsed(|parsed| {
            let headers = parsed.get_headers();
            // get_first_value decodes RFC 2047 encoded words; undecodable
            // words are passed through as raw text.
            let from_address = headers.get_first_value("From").unwrap_or_default();
            let subject = headers.get_first_value("Subject").unwrap_or_default();
            let date = headers.get_first_value("Date").unwrap_or_default();
            logger.debug(&format!(
                "parsed headers of {}: from {:?}, subject {:?}",
                id, from_address, subject
            ));

            let mut attachments = Vec::new();
            if include_attachments {
                collect_attachments(parsed, &mut attachments, logger);
            }
            (from_address, subject, date, attachments)
        });

        Ok(Message {
            id: id.to_string(),
            from_address,
            subject,
            date,
            attachments,
            tree,
        })
    }

    /// Extracts the first body part with exactly the given content type,
    /// e.g. `text/plain` or `text/html`.
    ///
    /// The payload is decoded using the charset the part declares, falling
    /// back to UTF-8, and finally to a lossy UTF-8 decode. Returns `None`
    /// when no part of that type carries any payload.
    pub fn body(&self, content_type: &str) -> Option<String> {
        self.tree.with_parsed(|parsed| body_of(parsed, content_type))
    }
}

fn body_of(part: &ParsedMail<'_>, content_type: &str) -> Option<String> {
    if part.ctype.mimetype.eq_ignore_ascii_case(content_type) {
        if let Some(text) = decode_text(part) {
            return Some(text);
        }
    }
    part.subparts
        .iter()
        .find_map(|sub| body_of(sub, content_type))
}

fn decode_text(part: &ParsedMail<'_>) -> Option<String> {
    let raw = part.get_body_raw().ok()?;
    if raw.is_empty() {
        return None;
    }
    // get_body applies the declared charset (itself falling back to UTF-8
    // for unknown labels); if even that fails, degrade to a lossy decode.
    match part.get_body() {
        Ok(text) => Some(text),
        Err(_) => Some(String::from_utf8_lossy(&raw).into_owned()),
    }
}

fn collect_attachments(part: &ParsedMail<'_>, out: &mut Vec<Attachment>, logger: &dyn LogSink) {
    if !part.ctype.mimetype.starts_with("multipart/") {
        extract_attachment(part, out, logger);
    }
    for sub in &part.subparts {
        collect_attachments(sub, out, logger);
    }
}

fn extract_attachment(part: &ParsedMail<'_>, out: &mut Vec<Attachment>, logger: &dyn LogSink) {
    let content_type = part.ctype.mimetype.clone();
    let content_id = part.get_headers().get_first_value("Content-ID");

    // The disposition header is parsed only when actually present; parts
    // without one must not be treated as implicitly inline.
    let disposition = part
        .get_headers()
        .get_first_value("Content-Disposition")
        .map(|value| mailparse::parse_content_disposition(&value));
    let filename = disposition
        .as_ref()
        .and_then(|d| d.params.get("filename").cloned())
        .or_else(|| part.ctype.params.get("name").cloned());

    let is_attachment = matches!(
        disposition.as_ref().map(|d| &d.disposition),
        Some(DispositionType::Attachment)
    );
    let is_inline = matches!(
        disposition.as_ref().map(|d| &d.disposition),
        Some(DispositionType::Inline)
    );

    if is_attachment {
        if let Some(filename) = &filename {
            match payload(part) {
                Some(data) => {
                    logger.debug(&format!(
                        "found attachment {:?} ({}, {} bytes)",
                        filename,
                        content_type,
                        data.len()
                    ));
                    out.push(Attachment {
                        filename: filename.clone(),
                        content_type,
                        data,
                        content_id,
                        is_inline: false,
                    });
                }
                None => logger.debug(&format!("attachment {:?} has no data, skipping", filename)),
            }
            return;
        }
    }
    if is_inline || (content_id.is_some() && content_type.starts_with("image/")) {
        match payload(part) {
            Some(data) => {
                let filename =
                    filename.unwrap_or_else(|| format!("inline_image.{}", subtype(&content_type)));
                logger.debug(&format!(
                    "found inline part {:?} ({}, content id {:?})",
                    filename, content_type, content_id
                ));
                out.push(Attachment {
                    filename,
                    content_type,
                    data,
                    content_id,
                    is_inline: true,
                });
            }
            None => logger.debug("inline part has no data, skipping"),
        }
        return;
    }
    if disposition.is_none() {
        // Some senders attach files without a Content-Disposition header at
        // all; a named part is still worth extracting.
        if let Some(filename) = filename {
            if let Some(data) = payload(part) {
                logger.debug(&format!(
                    "found attachment {:?} without disposition header",
                    filename
                ));
                out.push(Attachment {
                    filename,
                    content_type,
                    data,
                    content_id,
                    is_inline: false,
                });
            }
        }
    }
}

fn payload(part: &ParsedMail<'_>) -> Option<Vec<u8>> {
    match part.get_body_raw() {
        Ok(data) if !data.is_empty() => Some(data),
        _ => None,
    }
}

fn subtype(content_type: &str) -> &str {
    content_type.split('/').nth(1).unwrap_or("bin")
}

/// Rewrites the header block of a raw RFC 5322 message.
///
/// Every prior occurrence of each named header is removed, folded
/// continuation lines included, and the replacements are appended at the end
/// of the header block. The body bytes are passed through untouched.
pub fn replace_headers(raw: &[u8], headers: &[(String, String)]) -> Vec<u8> {
    let (head, body) = split_at_blank_line(raw);
    let names: Vec<String> = headers
        .iter()
        .map(|(name, _)| name.to_ascii_lowercase())
        .collect();

    let mut out = Vec::with_capacity(raw.len() + 64);
    let mut skipping = false;
    for line in lines_with_endings(head) {
        let continuation = line.first().is_some_and(|b| *b == b' ' || *b == b'\t');
        if continuation {
            if !skipping {
                out.extend_from_slice(line);
            }
            continue;
        }
        skipping = header_name(line).is_some_and(|name| names.contains(&name));
        if !skipping {
            out.extend_from_slice(line);
        }
    }
    for (name, value) in headers {
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(body);
    out
}

/// Splits a message into its header block (trailing line ending kept, blank
/// separator dropped) and body.
fn split_at_blank_line(raw: &[u8]) -> (&[u8], &[u8]) {
    if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
        (&raw[..pos + 2], &raw[pos + 4..])
    } else if let Some(pos) = raw.windows(2).position(|w| w == b"\n\n") {
        (&raw[..pos + 1], &raw[pos + 2..])
    } else {
        (raw, &[])
    }
}

fn lines_with_endings(buf: &[u8]) -> impl Iterator<Item = &[u8]> {
    let mut rest = buf;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let end = rest
            .iter()
            .position(|&b| b == b'\n')
            .map(|i| i + 1)
            .unwrap_or(rest.len());
        let (line, tail) = rest.split_at(end);
        rest = tail;
        Some(line)
    })
}

fn header_name(line: &[u8]) -> Option<String> {
    let colon = line.iter().position(|&b| b == b':')?;
    std::str::from_utf8(&line[..colon])
        .ok()
        .map(|name| name.trim().to_ascii_lowercase())
}
