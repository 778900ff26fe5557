#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use imapmirror::{
    Dialect, MailSession, MailboxListing, MessageIdentity, Reporter, Role, SessionError,
    SyncSummary,
};

pub const EXCHANGE_GREETING: &str = "* OK The Microsoft Exchange IMAP4 service is ready.";
pub const DOVECOT_GREETING: &str = "* OK [CAPABILITY IMAP4rev1 LITERAL+] Dovecot ready.";
pub const GENERIC_GREETING: &str = "* OK IMAP server ready";

/// Builds a small RFC 822 message. An empty `message_id` leaves the header out.
pub fn message(message_id: &str, body: &str) -> Vec<u8> {
    let mut raw = String::from("From: alice@example.com\r\nTo: bob@example.com\r\n");
    if !message_id.is_empty() {
        raw.push_str(&format!("Message-ID: <{}>\r\n", message_id));
    }
    raw.push_str(&format!("Subject: {}\r\n\r\n{}\r\n", body, body));
    raw.into_bytes()
}

/// In-memory IMAP account. Records every command it receives.
pub struct FakeServer {
    greeting: String,
    delimiter: char,
    order: Vec<String>,
    mailboxes: BTreeMap<String, Vec<Vec<u8>>>,
    selected: Option<(String, bool)>,
    pub commands: Vec<String>,
    list_failure: Option<String>,
    extra_list_lines: Vec<String>,
    select_refusals: HashMap<String, String>,
    header_failures: Vec<u32>,
}

impl FakeServer {
    pub fn new(greeting: &str) -> Self {
        let delimiter = match Dialect::detect(greeting) {
            Dialect::Exchange => '/',
            _ => '.',
        };
        Self {
            greeting: greeting.to_string(),
            delimiter,
            order: Vec::new(),
            mailboxes: BTreeMap::new(),
            selected: None,
            commands: Vec::new(),
            list_failure: None,
            extra_list_lines: Vec::new(),
            select_refusals: HashMap::new(),
            header_failures: Vec::new(),
        }
    }

    pub fn with_mailbox(mut self, name: &str, messages: Vec<Vec<u8>>) -> Self {
        self.order.push(name.to_string());
        self.mailboxes.insert(name.to_string(), messages);
        self
    }

    pub fn failing_list(mut self, reason: &str) -> Self {
        self.list_failure = Some(reason.to_string());
        self
    }

    pub fn with_list_line(mut self, line: &str) -> Self {
        self.extra_list_lines.push(line.to_string());
        self
    }

    pub fn refusing_select(mut self, name: &str, reason: &str) -> Self {
        self.select_refusals.insert(name.to_string(), reason.to_string());
        self
    }

    pub fn failing_header_fetch(mut self, seq: u32) -> Self {
        self.header_failures.push(seq);
        self
    }

    pub fn messages(&self, mailbox: &str) -> Option<&Vec<Vec<u8>>> {
        self.mailboxes.get(mailbox)
    }

    pub fn has_mailbox(&self, mailbox: &str) -> bool {
        self.mailboxes.contains_key(mailbox)
    }

    /// Commands whose verb is `verb`, e.g. "CREATE".
    pub fn commands_named(&self, verb: &str) -> Vec<&str> {
        self.commands
            .iter()
            .filter(|c| c.split_whitespace().next() == Some(verb))
            .map(String::as_str)
            .collect()
    }

    pub fn mentions(&self, mailbox: &str) -> bool {
        self.commands.iter().any(|c| c.ends_with(&format!(" {}", mailbox)))
    }

    fn selected_messages(&self) -> Result<&Vec<Vec<u8>>, SessionError> {
        let (name, _) = self
            .selected
            .as_ref()
            .ok_or_else(|| SessionError::Bad("No mailbox selected".to_string()))?;
        self.mailboxes
            .get(name)
            .ok_or_else(|| SessionError::No("Mailbox vanished".to_string()))
    }

    fn message_at(&self, seq: u32) -> Result<&Vec<u8>, SessionError> {
        self.selected_messages()?
            .get(seq as usize - 1)
            .ok_or_else(|| SessionError::Bad(format!("Invalid message sequence number {}", seq)))
    }
}

impl MailSession for FakeServer {
    fn greeting(&self) -> &str {
        &self.greeting
    }

    fn list_all(&mut self) -> Result<Vec<String>, SessionError> {
        self.commands.push("LIST".to_string());
        if let Some(reason) = &self.list_failure {
            return Err(SessionError::No(reason.clone()));
        }
        let mut lines: Vec<String> = self
            .order
            .iter()
            .map(|name| format!("(\\HasNoChildren) \"{}\" \"{}\"", self.delimiter, name))
            .collect();
        lines.extend(self.extra_list_lines.iter().cloned());
        Ok(lines)
    }

    fn create(&mut self, mailbox: &str) -> Result<(), SessionError> {
        self.commands.push(format!("CREATE {}", mailbox));
        if self.mailboxes.contains_key(mailbox) {
            return Err(SessionError::No("Mailbox already exists".to_string()));
        }
        self.order.push(mailbox.to_string());
        self.mailboxes.insert(mailbox.to_string(), Vec::new());
        Ok(())
    }

    fn select(&mut self, mailbox: &str, read_only: bool) -> Result<(), SessionError> {
        let verb = if read_only { "EXAMINE" } else { "SELECT" };
        self.commands.push(format!("{} {}", verb, mailbox));
        if let Some(reason) = self.select_refusals.get(mailbox) {
            self.selected = None;
            return Err(SessionError::No(reason.clone()));
        }
        if !self.mailboxes.contains_key(mailbox) {
            self.selected = None;
            return Err(SessionError::No("Mailbox doesn't exist".to_string()));
        }
        self.selected = Some((mailbox.to_string(), read_only));
        Ok(())
    }

    fn search_all(&mut self) -> Result<Vec<u32>, SessionError> {
        self.commands.push("SEARCH ALL".to_string());
        let count = self.selected_messages()?.len() as u32;
        Ok((1..=count).collect())
    }

    fn fetch_header(&mut self, seq: u32) -> Result<Vec<u8>, SessionError> {
        self.commands.push(format!("FETCH {} BODY.PEEK[HEADER]", seq));
        if self.header_failures.contains(&seq) {
            return Err(SessionError::No("Fetch failed".to_string()));
        }
        let raw = self.message_at(seq)?;
        let end = raw
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .map(|p| p + 4)
            .unwrap_or(raw.len());
        Ok(raw[..end].to_vec())
    }

    fn fetch_message(&mut self, seq: u32) -> Result<Vec<u8>, SessionError> {
        self.commands.push(format!("FETCH {} RFC822", seq));
        Ok(self.message_at(seq)?.clone())
    }

    fn append(&mut self, mailbox: &str, content: &[u8]) -> Result<(), SessionError> {
        self.commands.push(format!("APPEND {}", mailbox));
        match self.mailboxes.get_mut(mailbox) {
            Some(messages) => {
                messages.push(content.to_vec());
                Ok(())
            }
            None => Err(SessionError::No("[TRYCREATE] Mailbox doesn't exist".to_string())),
        }
    }

    fn logout(&mut self) -> Result<(), SessionError> {
        self.commands.push("LOGOUT".to_string());
        Ok(())
    }
}

/// Keeps every reported event as a line of text.
#[derive(Default)]
pub struct RecordingReporter {
    pub events: RefCell<Vec<String>>,
}

impl RecordingReporter {
    fn push(&self, event: String) {
        self.events.borrow_mut().push(event);
    }

    pub fn contains(&self, event: &str) -> bool {
        self.events.borrow().iter().any(|e| e == event)
    }
}

impl Reporter for RecordingReporter {
    fn server_dialect(&self, role: Role, dialect: Dialect) {
        self.push(format!("dialect {} {}", role, dialect));
    }

    fn mailboxes(&self, role: Role, listings: &[MailboxListing]) {
        self.push(format!("mailboxes {} {}", role, listings.len()));
    }

    fn excluded(&self, mailbox: &str) {
        self.push(format!("excluded {}", mailbox));
    }

    fn sync_started(&self, source: &str, destination: &str) {
        self.push(format!("sync {} -> {}", source, destination));
    }

    fn create_failed(&self, mailbox: &str, _err: &SessionError) {
        self.push(format!("create failed {}", mailbox));
    }

    fn special_skipped(&self, mailbox: &str) {
        self.push(format!("special {}", mailbox));
    }

    fn destination_indexed(&self, messages: usize, identities: usize, anonymous: usize) {
        self.push(format!("indexed {} {} {}", messages, identities, anonymous));
    }

    fn source_listed(&self, messages: usize) {
        self.push(format!("source {}", messages));
    }

    fn copying(&self, identity: &MessageIdentity, dry_run: bool) {
        let verb = if dry_run { "would copy" } else { "copy" };
        self.push(format!("{} {}", verb, identity));
    }

    fn skipping(&self, identity: &MessageIdentity) {
        self.push(format!("skip {}", identity));
    }

    fn finished(&self, summary: &SyncSummary) {
        self.push(format!(
            "finished {} {}",
            summary.messages_copied, summary.messages_skipped
        ));
    }
}
