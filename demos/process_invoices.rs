//! Batch processing with a callback, and the composition pattern for
//! application-specific settings: filing rules live in their own struct next
//! to the `Account` instead of extending it.

use std::collections::HashMap;

use mailroom::{Account, Client};

struct FilingRules {
    attachment_dir: String,
    processed_folder: String,
}

fn main() {
    // An account description often arrives as a flat key/value mapping, for
    // example from a config file; missing port/use_ssl keys take defaults.
    let mut config = HashMap::new();
    config.insert("name".to_string(), "Business Email".to_string());
    config.insert(
        "server".to_string(),
        std::env::var("IMAP_SERVER").unwrap_or_else(|_| "imap.example.com".into()),
    );
    config.insert(
        "username".to_string(),
        std::env::var("IMAP_USERNAME").unwrap_or_default(),
    );
    config.insert(
        "password".to_string(),
        std::env::var("IMAP_PASSWORD").unwrap_or_default(),
    );
    let account = Account::from_map(&config);

    let rules = FilingRules {
        attachment_dir: "invoice_attachments".to_string(),
        processed_folder: "Invoices".to_string(),
    };

    let mut client = Client::new(account);

    // First pass: pull down the invoice PDFs.
    if client.connect() {
        for (_id, message) in client.search(Some("SUBJECT \"invoice\" UNSEEN"), "INBOX") {
            for attachment in &message.attachments {
                if attachment.filename.to_lowercase().ends_with(".pdf") {
                    if let Some(path) =
                        client.save_attachment(attachment, rules.attachment_dir.as_ref(), true)
                    {
                        println!("saved invoice: {}", path.display());
                    }
                }
            }
        }
        client.disconnect();
    }

    // Second pass: mark matching messages read and file them away. The
    // callback decides what counts as handled; the client takes care of
    // connecting, flagging, and moving.
    let keywords = ["invoice", "bill", "payment", "receipt"];
    let processed = client.process_with_callback(
        |message| {
            let subject = message.subject.to_lowercase();
            if !keywords.iter().any(|keyword| subject.contains(keyword)) {
                return Ok(false);
            }
            println!("processing potential invoice from {}", message.from_address);
            let has_pdf = message
                .attachments
                .iter()
                .any(|a| a.filename.to_lowercase().ends_with(".pdf"));
            Ok(has_pdf)
        },
        Some("UNSEEN"),
        "INBOX",
        true,
        Some(rules.processed_folder.as_str()),
    );
    println!("processed {} invoices", processed);
}
