//! Server dialect detection.
//!
//! IMAP servers disagree on how hierarchical mailbox names are spelled, and
//! some of them refuse to open certain system mailboxes. Both behaviours are
//! keyed on a [`Dialect`] guessed once from the server greeting.

use std::fmt;

/// Hierarchy convention spoken by an IMAP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    /// Microsoft Exchange: `/` separates levels, `.` is a literal character.
    Exchange,
    /// Dovecot: `.` separates levels.
    Dovecot,
    /// Anything else, treated like Dovecot.
    #[default]
    Unknown,
}

/// Greeting fragments, matched case-insensitively in table order.
const GREETING_RULES: &[(&str, Dialect)] = &[
    ("microsoft exchange", Dialect::Exchange),
    ("imapfront", Dialect::Dovecot),
    ("dovecot", Dialect::Dovecot),
];

/// Fragments of a NO response to SELECT/EXAMINE meaning the mailbox exists
/// but can never be opened.
const UNSELECTABLE_RULES: &[(Dialect, &str)] = &[(Dialect::Exchange, "special mailbox")];

impl Dialect {
    /// Classifies a server from its greeting. The first matching rule wins.
    pub fn detect(greeting: &str) -> Self {
        let greeting = greeting.to_lowercase();
        GREETING_RULES
            .iter()
            .find(|(fragment, _)| greeting.contains(fragment))
            .map(|(_, dialect)| *dialect)
            .unwrap_or(Dialect::Unknown)
    }

    /// Whether a refused select is this dialect's "special mailbox" quirk
    /// rather than a real failure.
    pub fn is_unselectable(self, refusal: &str) -> bool {
        let refusal = refusal.to_lowercase();
        UNSELECTABLE_RULES
            .iter()
            .any(|(dialect, fragment)| *dialect == self && refusal.contains(fragment))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Exchange => "exchange",
            Dialect::Dovecot => "dovecot",
            Dialect::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
