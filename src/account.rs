use std::collections::HashMap;

/// Configuration for one IMAP account.
///
/// An `Account` is a plain record: it performs no validation and opens no
/// connections. Malformed servers or credentials only surface when a
/// [`Client`](crate::Client) attempts to connect with it.
///
/// Applications that need extra per-account settings should carry them in
/// their own struct next to the `Account` rather than wrapping or extending
/// this type; see `demos/process_invoices.rs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// A human-readable label, used only in log output.
    pub name: String,
    /// The IMAP server hostname.
    pub server: String,
    pub username: String,
    pub password: String,
    /// Server port, 993 by default.
    pub port: u16,
    /// Whether to wrap the connection in TLS, on by default.
    pub use_tls: bool,
}

const DEFAULT_PORT: u16 = 993;

impl Account {
    /// Creates an account from explicit fields.
    pub fn new(
        name: impl Into<String>,
        server: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        port: u16,
        use_tls: bool,
    ) -> Account {
        Account {
            name: name.into(),
            server: server.into(),
            username: username.into(),
            password: password.into(),
            port,
            use_tls,
        }
    }

    /// Creates an account from a flat string mapping.
    ///
    /// Recognized keys are `name`, `server`, `username`, `password`, `port`,
    /// and `use_ssl`. Any missing key takes its default: empty strings, port
    /// 993, TLS on. An unparseable `port` falls back to 993, and `use_ssl`
    /// accepts `true`/`false`, `yes`/`no`, and `1`/`0` in any case.
    pub fn from_map(data: &HashMap<String, String>) -> Account {
        let field = |key: &str| data.get(key).cloned().unwrap_or_default();
        let port = data
            .get("port")
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let use_tls = data
            .get("use_ssl")
            .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "false" | "no" | "0"))
            .unwrap_or(true);
        Account {
            name: field("name"),
            server: field("server"),
            username: field("username"),
            password: field("password"),
            port,
            use_tls,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn from_map_defaults() {
        let account = Account::from_map(&map(&[
            ("name", "Work"),
            ("server", "imap.example.com"),
            ("username", "user@example.com"),
            ("password", "hunter2"),
        ]));
        assert_eq!(account.port, 993);
        assert!(account.use_tls);
        assert_eq!(account.server, "imap.example.com");
    }

    #[test]
    fn from_map_explicit_values() {
        let account = Account::from_map(&map(&[
            ("server", "mail.example.com"),
            ("port", "143"),
            ("use_ssl", "false"),
        ]));
        assert_eq!(account.port, 143);
        assert!(!account.use_tls);
        assert_eq!(account.name, "");
    }

    #[test]
    fn from_map_sloppy_values() {
        let account = Account::from_map(&map(&[("port", "not-a-port"), ("use_ssl", "No")]));
        assert_eq!(account.port, 993);
        assert!(!account.use_tls);

        let account = Account::from_map(&map(&[("use_ssl", "1")]));
        assert!(account.use_tls);
    }
}
