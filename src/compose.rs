//! Assembly of outbound MIME messages for forwarding and drafts.

use lettre::message::header::ContentType;
use lettre::message::{Attachment as AttachmentPart, Message as Email, MultiPart, SinglePart};

use crate::error::Result;
use crate::message::{Attachment, Message};

/// Everything needed to assemble one outbound message.
pub(crate) struct Outbound<'a> {
    pub from: &'a str,
    pub to: &'a [String],
    pub cc: &'a [String],
    pub bcc: &'a [String],
    pub subject: &'a str,
    pub text: Option<String>,
    pub html: Option<String>,
    pub attachments: &'a [Attachment],
}

enum BodyPart {
    Single(SinglePart),
    Multi(MultiPart),
}

fn attach_body(container: MultiPart, body: BodyPart) -> MultiPart {
    match body {
        BodyPart::Single(part) => container.singlepart(part),
        BodyPart::Multi(part) => container.multipart(part),
    }
}

/// Builds the outbound message, picking the MIME structure from what it
/// carries: a bare body part, an `alternative` pair when both text and HTML
/// are present, a `related` group when inline images must stay displayable,
/// and a `mixed` envelope when regular attachments ride along.
pub(crate) fn build(outbound: &Outbound<'_>) -> Result<Email> {
    let mut builder = Email::builder()
        .from(outbound.from.parse()?)
        .subject(outbound.subject);
    for to in outbound.to {
        builder = builder.to(to.parse()?);
    }
    for cc in outbound.cc {
        builder = builder.cc(cc.parse()?);
    }
    for bcc in outbound.bcc {
        builder = builder.bcc(bcc.parse()?);
    }

    let body = match (outbound.text.clone(), outbound.html.clone()) {
        (Some(text), Some(html)) => BodyPart::Multi(MultiPart::alternative_plain_html(text, html)),
        (None, Some(html)) => BodyPart::Single(SinglePart::html(html)),
        (text, None) => BodyPart::Single(SinglePart::plain(text.unwrap_or_default())),
    };

    let inline: Vec<&Attachment> = outbound.attachments.iter().filter(|a| a.is_inline).collect();
    let regular: Vec<&Attachment> = outbound
        .attachments
        .iter()
        .filter(|a| !a.is_inline)
        .collect();

    let body = if inline.is_empty() {
        body
    } else {
        let mut related = attach_body(MultiPart::related().build(), body);
        for attachment in inline {
            related = related.singlepart(inline_part(attachment));
        }
        BodyPart::Multi(related)
    };

    let email = if regular.is_empty() {
        match body {
            BodyPart::Single(part) => builder.singlepart(part)?,
            BodyPart::Multi(part) => builder.multipart(part)?,
        }
    } else {
        let mut mixed = attach_body(MultiPart::mixed().build(), body);
        for attachment in regular {
            mixed = mixed.singlepart(file_part(attachment));
        }
        builder.multipart(mixed)?
    };
    Ok(email)
}

fn file_part(attachment: &Attachment) -> SinglePart {
    AttachmentPart::new(attachment.filename.clone())
        .body(attachment.data.clone(), content_type_of(attachment))
}

fn inline_part(attachment: &Attachment) -> SinglePart {
    let cid = content_id_token(
        attachment
            .content_id
            .as_deref()
            .unwrap_or(&attachment.filename),
    );
    AttachmentPart::new_inline(cid).body(attachment.data.clone(), content_type_of(attachment))
}

fn content_type_of(attachment: &Attachment) -> ContentType {
    ContentType::parse(&attachment.content_type)
        .unwrap_or_else(|_| ContentType::parse("application/octet-stream").unwrap())
}

/// Strips any angle brackets from a content id so the generated
/// `Content-ID` header ends up bracket-wrapped exactly once.
pub(crate) fn content_id_token(id: &str) -> String {
    id.trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .to_string()
}

/// The plain-text body of a forwarded message: any additional text first,
/// then the standard forwarded-message block, then the original body.
pub(crate) fn forward_text(message: &Message, additional: &str) -> String {
    let mut out = String::new();
    if !additional.is_empty() {
        out.push_str(additional);
        out.push_str("\n\n");
    }
    out.push_str("---------- Forwarded message ----------\n");
    out.push_str(&format!("From: {}\n", message.from_address));
    out.push_str(&format!("Date: {}\n", message.date));
    out.push_str(&format!("Subject: {}\n\n", message.subject));
    out.push_str(&message.body("text/plain").unwrap_or_default());
    out
}

/// The HTML counterpart of [`forward_text`], wrapping the same header block
/// around the original HTML body.
pub(crate) fn forward_html(message: &Message, additional: &str, original_html: &str) -> String {
    let mut out = String::new();
    if !additional.is_empty() {
        out.push_str(&format!("<p>{}</p>\n", additional));
    }
    out.push_str("<div>---------- Forwarded message ----------<br>\n");
    out.push_str(&format!("From: {}<br>\n", message.from_address));
    out.push_str(&format!("Date: {}<br>\n", message.date));
    out.push_str(&format!("Subject: {}</div>\n<br>\n", message.subject));
    out.push_str(original_html);
    out
}
