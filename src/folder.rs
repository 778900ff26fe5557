use crate::dialect::Dialect;

/// Mailbox path in the dot-separated convention, used only as the pivot
/// between two dialects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalPath(String);

impl CanonicalPath {
    /// Reads `path` as spelled by a `dialect` server.
    pub fn from_dialect(path: &str, dialect: Dialect) -> Self {
        match dialect {
            Dialect::Exchange => CanonicalPath(path.replace('.', " ").replace('/', ".")),
            Dialect::Dovecot | Dialect::Unknown => CanonicalPath(path.to_string()),
        }
    }

    /// Spells this path the way a `dialect` server expects it.
    pub fn to_dialect(&self, dialect: Dialect) -> String {
        match dialect {
            Dialect::Exchange => self.0.replace('/', " ").replace('.', "/"),
            Dialect::Dovecot | Dialect::Unknown => self.0.clone(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Renames a source mailbox into the destination's hierarchy convention.
///
/// The result is not validated; an illegal name shows up when the
/// destination refuses to create or select it.
pub fn translate(path: &str, source: Dialect, destination: Dialect) -> String {
    CanonicalPath::from_dialect(path, source).to_dialect(destination)
}
