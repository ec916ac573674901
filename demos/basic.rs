//! Basic usage: connect, list unread messages, save PDF attachments.
//!
//! Configure the account through `IMAP_SERVER`, `IMAP_USERNAME`, and
//! `IMAP_PASSWORD` before running.

use mailroom::{Account, Client};

fn main() {
    let account = Account::new(
        "My Email Account",
        std::env::var("IMAP_SERVER").unwrap_or_else(|_| "imap.example.com".into()),
        std::env::var("IMAP_USERNAME").unwrap_or_default(),
        std::env::var("IMAP_PASSWORD").unwrap_or_default(),
        993,
        true,
    );
    let mut client = Client::new(account);

    if !client.connect() {
        eprintln!("failed to connect to IMAP server");
        return;
    }

    let messages = client.unread();
    if messages.is_empty() {
        println!("no unread messages found");
        client.disconnect();
        return;
    }
    println!("found {} unread messages", messages.len());

    for (id, message) in &messages {
        println!("==================================================");
        println!("Message ID: {}", id);
        println!("From:       {}", message.from_address);
        println!("Subject:    {}", message.subject);
        println!("Date:       {}", message.date);
        println!("Attachments: {}", message.attachments.len());

        for attachment in &message.attachments {
            println!("  - {} ({})", attachment.filename, attachment.content_type);
            if attachment.filename.to_lowercase().ends_with(".pdf") {
                if let Some(path) =
                    client.save_attachment(attachment, "downloaded_attachments".as_ref(), true)
                {
                    println!("    saved to {}", path.display());
                }
            }
        }

        if message.subject.to_lowercase().contains("important") && client.set_read(id, true) {
            println!("marked as read (contains 'important' in subject)");
        }
    }

    client.disconnect();
}
