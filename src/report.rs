//! Progress reporting for a mirror run.
//!
//! The sync engine never prints. It calls a [`Reporter`] at every step, and
//! the caller decides where those lines go.

use log::{debug, info, warn};

use crate::dialect::Dialect;
use crate::index::MessageIdentity;
use crate::mailbox::MailboxListing;
use crate::session::{Role, SessionError};
use crate::sync::SyncSummary;

/// Receives human-readable progress events. None of them influence the run.
pub trait Reporter {
    fn server_dialect(&self, role: Role, dialect: Dialect);
    fn mailboxes(&self, role: Role, listings: &[MailboxListing]);
    fn excluded(&self, mailbox: &str);
    fn sync_started(&self, source: &str, destination: &str);
    fn create_failed(&self, mailbox: &str, err: &SessionError);
    fn special_skipped(&self, mailbox: &str);
    fn destination_indexed(&self, messages: usize, identities: usize, anonymous: usize);
    fn source_listed(&self, messages: usize);
    fn copying(&self, identity: &MessageIdentity, dry_run: bool);
    fn skipping(&self, identity: &MessageIdentity);
    fn finished(&self, summary: &SyncSummary);
}

/// Writes every event through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn server_dialect(&self, role: Role, dialect: Dialect) {
        info!("{} server type is {}", role, dialect);
    }

    fn mailboxes(&self, role: Role, listings: &[MailboxListing]) {
        info!("{} mailboxes ({}):", role, listings.len());
        for listing in listings {
            let delimiter = listing
                .delimiter
                .map(|d| d.to_string())
                .unwrap_or_else(|| "NIL".to_string());
            let flags: Vec<&str> = listing.flags.iter().map(String::as_str).collect();
            info!("  {} [delimiter {}] ({})", listing.name, delimiter, flags.join(" "));
            if listing.has_flag("\\Noselect") {
                debug!("  {} is not selectable on the {} server", listing.name, role);
            }
        }
    }

    fn excluded(&self, mailbox: &str) {
        info!("Skipping {} (excluded)", mailbox);
    }

    fn sync_started(&self, source: &str, destination: &str) {
        info!("Syncing {} into {}", source, destination);
    }

    fn create_failed(&self, mailbox: &str, err: &SessionError) {
        warn!("Could not create {} (continuing): {}", mailbox, err);
    }

    fn special_skipped(&self, mailbox: &str) {
        warn!("Skipping special Microsoft Exchange mailbox {}", mailbox);
    }

    fn destination_indexed(&self, messages: usize, identities: usize, anonymous: usize) {
        info!(
            "Found {} messages in destination folder, {} message IDs acquired",
            messages, identities
        );
        if anonymous > 0 {
            warn!("{} destination messages have no Message-ID", anonymous);
        }
    }

    fn source_listed(&self, messages: usize) {
        info!("Found {} messages in source folder", messages);
    }

    fn copying(&self, identity: &MessageIdentity, dry_run: bool) {
        if dry_run {
            info!("Would copy message {}", identity);
        } else {
            debug!("Copying message {}", identity);
        }
    }

    fn skipping(&self, identity: &MessageIdentity) {
        debug!("Skipping message {}", identity);
    }

    fn finished(&self, summary: &SyncSummary) {
        info!(
            "Done: {} mailboxes synced, {} excluded, {} special skipped; {} messages copied, {} already present",
            summary.mailboxes_synced,
            summary.mailboxes_excluded,
            summary.mailboxes_special,
            summary.messages_copied,
            summary.messages_skipped
        );
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn server_dialect(&self, _role: Role, _dialect: Dialect) {}
    fn mailboxes(&self, _role: Role, _listings: &[MailboxListing]) {}
    fn excluded(&self, _mailbox: &str) {}
    fn sync_started(&self, _source: &str, _destination: &str) {}
    fn create_failed(&self, _mailbox: &str, _err: &SessionError) {}
    fn special_skipped(&self, _mailbox: &str) {}
    fn destination_indexed(&self, _messages: usize, _identities: usize, _anonymous: usize) {}
    fn source_listed(&self, _messages: usize) {}
    fn copying(&self, _identity: &MessageIdentity, _dry_run: bool) {}
    fn skipping(&self, _identity: &MessageIdentity) {}
    fn finished(&self, _summary: &SyncSummary) {}
}
