use std::collections::BTreeSet;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::session::{MailSession, SessionError};

lazy_static! {
    // (flags) delimiter name, where delimiter is a quoted char or NIL and the
    // name is a quoted string or a bare atom.
    static ref LIST_LINE_RE: Regex = Regex::new(
        r#"^\((?P<flags>[^)]*)\)\s+(?:"(?P<delim>\\?.)"|(?i:NIL))\s+(?:"(?P<quoted>(?:[^"\\]|\\.)*)"|(?P<bare>[^\s"{][^\s"]*))$"#
    )
    .expect("LIST grammar is a valid regex");
}

#[derive(Error, Debug)]
pub enum ListingError {
    #[error("LIST command failed: {0}")]
    Command(#[from] SessionError),

    #[error("malformed LIST entry: {0}")]
    Malformed(String),
}

/// One mailbox as reported by `LIST`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxListing {
    pub flags: BTreeSet<String>,
    /// Hierarchy delimiter; `None` when the server answered `NIL`.
    pub delimiter: Option<char>,
    pub name: String,
}

impl MailboxListing {
    /// Parses the part of a `LIST` response after `* LIST `.
    pub fn parse(line: &str) -> Result<Self, ListingError> {
        let caps = LIST_LINE_RE
            .captures(line.trim())
            .ok_or_else(|| ListingError::Malformed(line.to_string()))?;

        let flags = caps["flags"].split_whitespace().map(str::to_string).collect();
        let delimiter = caps.name("delim").and_then(|d| unescape(d.as_str()).chars().next());
        let name = match (caps.name("quoted"), caps.name("bare")) {
            (Some(quoted), _) => unescape(quoted.as_str()),
            (None, Some(bare)) => bare.as_str().to_string(),
            (None, None) => return Err(ListingError::Malformed(line.to_string())),
        };

        Ok(Self { flags, delimiter, name })
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f.eq_ignore_ascii_case(flag))
    }
}

/// Lists every mailbox on `session`. Any entry outside the grammar aborts
/// the whole listing.
pub fn list_mailboxes(session: &mut dyn MailSession) -> Result<Vec<MailboxListing>, ListingError> {
    let lines = session.list_all()?;
    lines.iter().map(|line| MailboxListing::parse(line)).collect()
}

fn unescape(quoted: &str) -> String {
    let mut out = String::with_capacity(quoted.len());
    let mut chars = quoted.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quoted_name() {
        let listing = MailboxListing::parse(r#"(\HasNoChildren) "/" "Sent Items""#).unwrap();
        assert_eq!(listing.name, "Sent Items");
        assert_eq!(listing.delimiter, Some('/'));
        assert!(listing.has_flag("\\hasnochildren"));
    }

    #[test]
    fn parses_bare_name_and_empty_flags() {
        let listing = MailboxListing::parse(r#"() "." INBOX"#).unwrap();
        assert_eq!(listing.name, "INBOX");
        assert_eq!(listing.delimiter, Some('.'));
        assert!(listing.flags.is_empty());
    }

    #[test]
    fn parses_nil_delimiter() {
        let listing = MailboxListing::parse(r#"(\Noselect) NIL "Public""#).unwrap();
        assert_eq!(listing.delimiter, None);
        assert_eq!(listing.name, "Public");
        assert!(listing.has_flag("\\Noselect"));
    }

    #[test]
    fn unescapes_quoted_specials() {
        let listing = MailboxListing::parse(r#"() "\\" "say \"hi\"""#).unwrap();
        assert_eq!(listing.delimiter, Some('\\'));
        assert_eq!(listing.name, "say \"hi\"");
    }

    #[test]
    fn collects_multiple_flags() {
        let listing =
            MailboxListing::parse(r#"(\HasChildren \Marked) "/" "Archive""#).unwrap();
        let flags: Vec<&str> = listing.flags.iter().map(String::as_str).collect();
        assert_eq!(flags, vec!["\\HasChildren", "\\Marked"]);
    }

    #[test]
    fn rejects_lines_outside_the_grammar() {
        for line in [
            r#""/" "INBOX""#,
            r#"(\HasNoChildren) "/" {5}"#,
            r#"(\HasNoChildren) "/" "unterminated"#,
            "",
        ] {
            assert!(
                matches!(MailboxListing::parse(line), Err(ListingError::Malformed(_))),
                "accepted {:?}",
                line
            );
        }
    }
}
