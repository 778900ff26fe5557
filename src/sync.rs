//! One-way mailbox mirroring.
//!
//! Every source mailbox goes through the same steps, in order:
//!
//! 1. the raw name is checked against the exclusion rules, then translated
//!    into the destination's hierarchy convention;
//! 2. the destination mailbox is created (a refusal is tolerated);
//! 3. the source mailbox is examined read-only, skipping the mailboxes the
//!    source dialect reports as unselectable;
//! 4. the destination mailbox is selected read-write and indexed by
//!    `Message-ID`;
//! 5. every source message whose identity is not indexed is appended.
//!
//! Any other failure aborts the whole run.

use log::debug;
use regex::Regex;
use thiserror::Error;

use crate::dialect::Dialect;
use crate::folder::translate;
use crate::index::{build_index, list_message_ids, resolve_identity, IdentityIndex, IndexError};
use crate::mailbox::{list_mailboxes, ListingError, MailboxListing};
use crate::report::Reporter;
use crate::session::{MailSession, Role, SessionError};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("LIST on {role} failed: {source}")]
    ListMailboxes { role: Role, source: SessionError },

    #[error("{role} sent a LIST entry that could not be parsed: {line}")]
    MalformedListing { role: Role, line: String },

    #[error("could not open source mailbox {mailbox}: {source}")]
    SelectSource { mailbox: String, source: SessionError },

    #[error("could not open destination mailbox {mailbox}: {source}")]
    SelectDestination { mailbox: String, source: SessionError },

    #[error("indexing {role} mailbox {mailbox} failed: {source}")]
    Index {
        role: Role,
        mailbox: String,
        source: IndexError,
    },

    #[error("fetching message {seq} from {mailbox} failed: {source}")]
    FetchMessage {
        mailbox: String,
        seq: u32,
        source: SessionError,
    },

    #[error("appending to {mailbox} failed: {source}")]
    Append { mailbox: String, source: SessionError },
}

impl SyncError {
    fn listing(role: Role, err: ListingError) -> Self {
        match err {
            ListingError::Command(source) => SyncError::ListMailboxes { role, source },
            ListingError::Malformed(line) => SyncError::MalformedListing { role, line },
        }
    }
}

/// Source mailbox names that must never be mirrored.
#[derive(Debug, Default, Clone)]
pub struct ExclusionRules {
    patterns: Vec<Regex>,
}

impl ExclusionRules {
    /// Patterns match anywhere in the name; prefix one with `^` to match only
    /// at the start.
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// First rule matching anywhere in `mailbox`.
    pub fn first_match(&self, mailbox: &str) -> Option<&Regex> {
        self.patterns.iter().find(|p| p.is_match(mailbox))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// How one source mailbox ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailboxOutcome {
    Excluded,
    SkippedSpecial,
    Synced { copied: usize, skipped: usize },
}

/// Totals for a whole run. In dry-run mode `messages_copied` counts the
/// messages that would have been appended.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncSummary {
    pub mailboxes_synced: usize,
    pub mailboxes_excluded: usize,
    pub mailboxes_special: usize,
    pub messages_copied: usize,
    pub messages_skipped: usize,
}

impl SyncSummary {
    fn record(&mut self, outcome: &MailboxOutcome) {
        match outcome {
            MailboxOutcome::Excluded => self.mailboxes_excluded += 1,
            MailboxOutcome::SkippedSpecial => self.mailboxes_special += 1,
            MailboxOutcome::Synced { copied, skipped } => {
                self.mailboxes_synced += 1;
                self.messages_copied += copied;
                self.messages_skipped += skipped;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Decide what to copy without creating or appending anything.
    pub dry_run: bool,
}

/// A source mailbox after name resolution.
enum Resolved {
    Excluded,
    Pending { source: String, destination: String },
}

/// A source mailbox after the read-only select.
enum Opened {
    Special,
    Ready,
}

pub struct SyncEngine<'a> {
    source: &'a mut dyn MailSession,
    destination: &'a mut dyn MailSession,
    exclusions: &'a ExclusionRules,
    reporter: &'a dyn Reporter,
    options: SyncOptions,
    source_dialect: Dialect,
    destination_dialect: Dialect,
}

impl<'a> SyncEngine<'a> {
    pub fn new(
        source: &'a mut dyn MailSession,
        destination: &'a mut dyn MailSession,
        exclusions: &'a ExclusionRules,
        reporter: &'a dyn Reporter,
    ) -> Self {
        let source_dialect = Dialect::detect(source.greeting());
        let destination_dialect = Dialect::detect(destination.greeting());
        Self {
            source,
            destination,
            exclusions,
            reporter,
            options: SyncOptions::default(),
            source_dialect,
            destination_dialect,
        }
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    /// Mirrors every source mailbox. Sessions are left open for the caller.
    pub fn run(&mut self) -> Result<SyncSummary, SyncError> {
        self.reporter.server_dialect(Role::Source, self.source_dialect);
        self.reporter
            .server_dialect(Role::Destination, self.destination_dialect);

        let source_mailboxes = list_mailboxes(&mut *self.source)
            .map_err(|e| SyncError::listing(Role::Source, e))?;
        self.reporter.mailboxes(Role::Source, &source_mailboxes);

        let destination_mailboxes = list_mailboxes(&mut *self.destination)
            .map_err(|e| SyncError::listing(Role::Destination, e))?;
        self.reporter
            .mailboxes(Role::Destination, &destination_mailboxes);

        let mut summary = SyncSummary::default();
        for listing in &source_mailboxes {
            let outcome = self.sync_mailbox(listing, &destination_mailboxes)?;
            debug!("{} -> {:?}", listing.name, outcome);
            summary.record(&outcome);
        }

        self.reporter.finished(&summary);
        Ok(summary)
    }

    fn sync_mailbox(
        &mut self,
        listing: &MailboxListing,
        existing: &[MailboxListing],
    ) -> Result<MailboxOutcome, SyncError> {
        let (source, destination) = match self.resolve(&listing.name) {
            Resolved::Excluded => {
                self.reporter.excluded(&listing.name);
                return Ok(MailboxOutcome::Excluded);
            }
            Resolved::Pending { source, destination } => (source, destination),
        };
        self.reporter.sync_started(&source, &destination);

        self.provision(&destination);

        if let Opened::Special = self.open_source(&source)? {
            self.reporter.special_skipped(&source);
            return Ok(MailboxOutcome::SkippedSpecial);
        }

        let index = self.index_destination(&destination, existing)?;
        self.reporter
            .destination_indexed(index.messages(), index.len(), index.anonymous());

        let (copied, skipped) = self.copy_missing(&source, &destination, &index)?;
        Ok(MailboxOutcome::Synced { copied, skipped })
    }

    fn resolve(&self, name: &str) -> Resolved {
        if let Some(rule) = self.exclusions.first_match(name) {
            debug!("{} matches exclusion {}", name, rule);
            return Resolved::Excluded;
        }
        Resolved::Pending {
            source: name.to_string(),
            destination: translate(name, self.source_dialect, self.destination_dialect),
        }
    }

    fn provision(&mut self, destination: &str) {
        if self.options.dry_run {
            return;
        }
        if let Err(err) = self.destination.create(destination) {
            self.reporter.create_failed(destination, &err);
        }
    }

    fn open_source(&mut self, mailbox: &str) -> Result<Opened, SyncError> {
        match self.source.select(mailbox, true) {
            Ok(()) => Ok(Opened::Ready),
            Err(err)
                if err
                    .refusal_text()
                    .map_or(false, |text| self.source_dialect.is_unselectable(text)) =>
            {
                Ok(Opened::Special)
            }
            Err(source) => Err(SyncError::SelectSource {
                mailbox: mailbox.to_string(),
                source,
            }),
        }
    }

    fn index_destination(
        &mut self,
        mailbox: &str,
        existing: &[MailboxListing],
    ) -> Result<IdentityIndex, SyncError> {
        if self.options.dry_run {
            // Nothing was created, so a mailbox missing at listing time is empty.
            if !existing.iter().any(|l| l.name == mailbox) {
                return Ok(IdentityIndex::default());
            }
        }

        self.destination
            .select(mailbox, self.options.dry_run)
            .map_err(|source| SyncError::SelectDestination {
                mailbox: mailbox.to_string(),
                source,
            })?;

        build_index(&mut *self.destination).map_err(|source| SyncError::Index {
            role: Role::Destination,
            mailbox: mailbox.to_string(),
            source,
        })
    }

    fn copy_missing(
        &mut self,
        source_mailbox: &str,
        destination_mailbox: &str,
        index: &IdentityIndex,
    ) -> Result<(usize, usize), SyncError> {
        let index_err = |source: IndexError| SyncError::Index {
            role: Role::Source,
            mailbox: source_mailbox.to_string(),
            source,
        };

        let seqs = list_message_ids(&mut *self.source).map_err(index_err)?;
        self.reporter.source_listed(seqs.len());

        let (mut copied, mut skipped) = (0, 0);
        for seq in seqs {
            let identity = resolve_identity(&mut *self.source, seq).map_err(index_err)?;
            if index.contains(&identity) {
                self.reporter.skipping(&identity);
                skipped += 1;
                continue;
            }

            self.reporter.copying(&identity, self.options.dry_run);
            if !self.options.dry_run {
                let content = self.source.fetch_message(seq).map_err(|source| {
                    SyncError::FetchMessage {
                        mailbox: source_mailbox.to_string(),
                        seq,
                        source,
                    }
                })?;
                self.destination
                    .append(destination_mailbox, &content)
                    .map_err(|source| SyncError::Append {
                        mailbox: destination_mailbox.to_string(),
                        source,
                    })?;
            }
            copied += 1;
        }

        Ok((copied, skipped))
    }
}
