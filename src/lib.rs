pub mod config;
pub mod connection;
pub mod dialect;
pub mod folder;
pub mod index;
pub mod mailbox;
pub mod report;
pub mod session;
pub mod sync;

// Re-export commonly used types
pub use config::{Account, Config, ConfigError, ImapSecurity};
pub use dialect::Dialect;
pub use index::{IdentityIndex, MessageIdentity};
pub use mailbox::MailboxListing;
pub use report::{LogReporter, Reporter, SilentReporter};
pub use session::{MailSession, Role, SessionError};
pub use sync::{ExclusionRules, MailboxOutcome, SyncEngine, SyncError, SyncOptions, SyncSummary};
