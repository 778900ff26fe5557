use std::collections::HashSet;
use std::fmt;

use log::debug;
use thiserror::Error;

use crate::session::{MailSession, SessionError};

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("SEARCH failed: {0}")]
    Search(#[source] SessionError),

    #[error("header FETCH of message {seq} failed: {source}")]
    Fetch { seq: u32, source: SessionError },
}

/// `Message-ID` of one message, or nothing when the header block has no
/// usable one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageIdentity(Option<String>);

impl MessageIdentity {
    pub fn new(message_id: impl Into<String>) -> Self {
        let message_id = message_id.into();
        if message_id.trim().is_empty() {
            Self(None)
        } else {
            Self(Some(message_id))
        }
    }

    pub fn anonymous() -> Self {
        Self(None)
    }

    /// Extracts the identity from a raw header block.
    pub fn from_headers(raw: &[u8]) -> Self {
        match mail_parser::Message::parse(raw) {
            Some(parsed) => parsed
                .message_id()
                .map(MessageIdentity::new)
                .unwrap_or_else(MessageIdentity::anonymous),
            None => MessageIdentity::anonymous(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.0.is_none()
    }
}

impl fmt::Display for MessageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(id) => write!(f, "<{}>", id),
            None => f.write_str("(no Message-ID)"),
        }
    }
}

/// Identities already present in one destination mailbox.
///
/// Anonymous identities are counted but never stored, so they can never
/// match.
#[derive(Debug, Default)]
pub struct IdentityIndex {
    known: HashSet<String>,
    messages: usize,
    anonymous: usize,
}

impl IdentityIndex {
    pub fn insert(&mut self, identity: MessageIdentity) {
        self.messages += 1;
        match identity.0 {
            Some(id) => {
                self.known.insert(id);
            }
            None => self.anonymous += 1,
        }
    }

    pub fn contains(&self, identity: &MessageIdentity) -> bool {
        identity.as_str().map_or(false, |id| self.known.contains(id))
    }

    /// Distinct identities held.
    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Messages inspected while building the index.
    pub fn messages(&self) -> usize {
        self.messages
    }

    pub fn anonymous(&self) -> usize {
        self.anonymous
    }
}

impl FromIterator<MessageIdentity> for IdentityIndex {
    fn from_iter<I: IntoIterator<Item = MessageIdentity>>(iter: I) -> Self {
        let mut index = IdentityIndex::default();
        for identity in iter {
            index.insert(identity);
        }
        index
    }
}

/// Sequence numbers of every message in the selected mailbox.
pub fn list_message_ids(session: &mut dyn MailSession) -> Result<Vec<u32>, IndexError> {
    session.search_all().map_err(IndexError::Search)
}

/// Fetches only the header block of `seq` and reads its `Message-ID`.
pub fn resolve_identity(
    session: &mut dyn MailSession,
    seq: u32,
) -> Result<MessageIdentity, IndexError> {
    let header = session
        .fetch_header(seq)
        .map_err(|source| IndexError::Fetch { seq, source })?;
    let identity = MessageIdentity::from_headers(&header);
    debug!("Message {} has identity {}", seq, identity);
    Ok(identity)
}

/// Resolves every message of the selected mailbox into an index.
pub fn build_index(session: &mut dyn MailSession) -> Result<IdentityIndex, IndexError> {
    let mut index = IdentityIndex::default();
    for seq in list_message_ids(session)? {
        index.insert(resolve_identity(session, seq)?);
    }
    Ok(index)
}
