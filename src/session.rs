use std::fmt;
use std::io::{Read, Write};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("server refused command: {0}")]
    No(String),

    #[error("server rejected command: {0}")]
    Bad(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("missing data: {0}")]
    MissingData(String),
}

impl SessionError {
    /// Text of a NO response, if that is what the server sent.
    pub fn refusal_text(&self) -> Option<&str> {
        match self {
            SessionError::No(text) => Some(text.as_str()),
            _ => None,
        }
    }
}

impl From<imap::error::Error> for SessionError {
    fn from(err: imap::error::Error) -> Self {
        match err {
            imap::error::Error::No(msg) => SessionError::No(msg),
            imap::error::Error::Bad(msg) => SessionError::Bad(msg),
            imap::error::Error::Io(e) => SessionError::Transport(e.to_string()),
            imap::error::Error::Tls(e) => SessionError::Transport(e.to_string()),
            imap::error::Error::ConnectionLost => {
                SessionError::Transport("connection lost".to_string())
            }
            other => SessionError::Protocol(other.to_string()),
        }
    }
}

/// Which side of the mirror a session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Source,
    Destination,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Source => f.write_str("source"),
            Role::Destination => f.write_str("destination"),
        }
    }
}

/// The IMAP commands the mirror issues against one authenticated account.
///
/// Implementations hold exactly one connection and run one command at a
/// time. Selection state lives in the implementation, so `search_all`,
/// `fetch_header` and `fetch_message` always refer to the mailbox passed to
/// the last successful `select`.
pub trait MailSession {
    /// Greeting line the server sent before authentication.
    fn greeting(&self) -> &str;

    /// Raw `LIST "" "*"` data lines, without the leading `* LIST `.
    fn list_all(&mut self) -> Result<Vec<String>, SessionError>;

    fn create(&mut self, mailbox: &str) -> Result<(), SessionError>;

    /// `EXAMINE` when `read_only`, `SELECT` otherwise.
    fn select(&mut self, mailbox: &str, read_only: bool) -> Result<(), SessionError>;

    /// Sequence numbers of every message in the selected mailbox, ascending.
    fn search_all(&mut self) -> Result<Vec<u32>, SessionError>;

    /// Header block of one message, fetched with `BODY.PEEK[HEADER]`.
    fn fetch_header(&mut self, seq: u32) -> Result<Vec<u8>, SessionError>;

    /// Full RFC 822 message.
    fn fetch_message(&mut self, seq: u32) -> Result<Vec<u8>, SessionError>;

    fn append(&mut self, mailbox: &str, content: &[u8]) -> Result<(), SessionError>;

    fn logout(&mut self) -> Result<(), SessionError>;
}

/// [`MailSession`] over a logged-in `imap::Session`.
pub struct ImapSession<T: Read + Write> {
    inner: imap::Session<T>,
    greeting: String,
}

impl<T: Read + Write> ImapSession<T> {
    pub fn new(inner: imap::Session<T>, greeting: String) -> Self {
        Self { inner, greeting }
    }
}

impl<T: Read + Write> MailSession for ImapSession<T> {
    fn greeting(&self) -> &str {
        &self.greeting
    }

    fn list_all(&mut self) -> Result<Vec<String>, SessionError> {
        let response = self.inner.run_command_and_read_response("LIST \"\" \"*\"")?;
        Ok(list_data_lines(&String::from_utf8_lossy(&response)))
    }

    fn create(&mut self, mailbox: &str) -> Result<(), SessionError> {
        self.inner.create(mailbox)?;
        Ok(())
    }

    fn select(&mut self, mailbox: &str, read_only: bool) -> Result<(), SessionError> {
        if read_only {
            self.inner.examine(mailbox)?;
        } else {
            self.inner.select(mailbox)?;
        }
        Ok(())
    }

    fn search_all(&mut self) -> Result<Vec<u32>, SessionError> {
        let mut seqs: Vec<u32> = self.inner.search("ALL")?.into_iter().collect();
        seqs.sort_unstable();
        Ok(seqs)
    }

    fn fetch_header(&mut self, seq: u32) -> Result<Vec<u8>, SessionError> {
        let fetches = self.inner.fetch(seq.to_string(), "BODY.PEEK[HEADER]")?;
        fetches
            .iter()
            .find_map(|f| f.header())
            .map(|h| h.to_vec())
            .ok_or_else(|| SessionError::MissingData(format!("no header for message {}", seq)))
    }

    fn fetch_message(&mut self, seq: u32) -> Result<Vec<u8>, SessionError> {
        let fetches = self.inner.fetch(seq.to_string(), "RFC822")?;
        fetches
            .iter()
            .find_map(|f| f.body())
            .map(|b| b.to_vec())
            .ok_or_else(|| SessionError::MissingData(format!("no body for message {}", seq)))
    }

    fn append(&mut self, mailbox: &str, content: &[u8]) -> Result<(), SessionError> {
        self.inner.append(mailbox, content)?;
        Ok(())
    }

    fn logout(&mut self) -> Result<(), SessionError> {
        self.inner.logout()?;
        Ok(())
    }
}

fn list_data_lines(response: &str) -> Vec<String> {
    response
        .lines()
        .filter_map(|line| line.strip_prefix("* LIST "))
        .map(|line| line.trim_end().to_string())
        .collect()
}
