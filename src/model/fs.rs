use std::{collections::HashMap, fmt, str::FromStr};

#[derive(Debug, thiserror::Error)]
pub enum FSError {
    #[error("object not found: {key}")]
    NotFound { key: String },

    #[error("failed to copy {from} to {to}")]
    CopyFailed { from: String, to: String },

    #[error("operation not supported: {operation}")]
    Unsupported { operation: &'static str },

    #[error("object {key} has no {attribute}")]
    MissingAttribute { key: String, attribute: &'static str },

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("{message}")]
    Client { message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl FSError {
    pub fn not_found(key: &str) -> Self {
        FSError::NotFound {
            key: key.to_string(),
        }
    }

    /// Wraps a backend failure as `failed to <op> at: <key>, <cause>`.
    pub fn client(op: &str, key: &str, err: impl fmt::Display) -> Self {
        FSError::Client {
            message: format!("failed to {} at: {}, {}", op, key, err),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FSError::NotFound { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryType {
    File,
    Dir,
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryType::File => write!(f, "file"),
            EntryType::Dir => write!(f, "dir"),
        }
    }
}

/// Attributes of an entry backed by a stored object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Metadata {
    pub kind: EntryType,
    pub path: String,
    pub dirname: String,
    pub timestamp: Option<i64>,
    pub mimetype: String,
    pub size: u64,
}

/// A directory inferred from the keys of other objects.
///
/// There is no object to ask for a size, timestamp or content type, so only
/// path-derived fields are carried.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmulatedDir {
    pub path: String,
    pub dirname: String,
    pub basename: String,
    pub filename: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListingEntry {
    Object(Metadata),
    Emulated(EmulatedDir),
}

impl ListingEntry {
    pub fn path(&self) -> &str {
        match self {
            ListingEntry::Object(meta) => &meta.path,
            ListingEntry::Emulated(dir) => &dir.path,
        }
    }

    pub fn dirname(&self) -> &str {
        match self {
            ListingEntry::Object(meta) => &meta.dirname,
            ListingEntry::Emulated(dir) => &dir.dirname,
        }
    }

    pub fn kind(&self) -> EntryType {
        match self {
            ListingEntry::Object(meta) => meta.kind,
            ListingEntry::Emulated(_) => EntryType::Dir,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind() == EntryType::Dir
    }

    pub fn is_file(&self) -> bool {
        self.kind() == EntryType::File
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Public => write!(f, "public"),
            Visibility::Private => write!(f, "private"),
        }
    }
}

impl FromStr for Visibility {
    type Err = FSError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            _ => Err(FSError::InvalidArgument {
                message: format!("failed to parse visibility: {}", s),
            }),
        }
    }
}

/// Per-write options supplied by the caller.
#[derive(Clone, Debug, Default)]
pub struct WriteConfig {
    pub visibility: Option<Visibility>,
    pub metadata: Option<HashMap<String, String>>,
    pub content_type: Option<String>,
}

impl WriteConfig {
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_visibility() {
        assert!(matches!("public".parse::<Visibility>(), Ok(Visibility::Public)));
        assert!(matches!("private".parse::<Visibility>(), Ok(Visibility::Private)));
        assert!(matches!(
            "world".parse::<Visibility>(),
            Err(FSError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_listing_entry_accessors() {
        let cases = vec![
            (
                ListingEntry::Object(Metadata {
                    kind: EntryType::File,
                    path: "a/file.txt".to_string(),
                    dirname: "a".to_string(),
                    timestamp: Some(1),
                    mimetype: "text/plain".to_string(),
                    size: 3,
                }),
                "a/file.txt",
                "a",
                false,
            ),
            (
                ListingEntry::Emulated(EmulatedDir {
                    path: "a/b".to_string(),
                    dirname: "a".to_string(),
                    basename: "b".to_string(),
                    filename: "b".to_string(),
                }),
                "a/b",
                "a",
                true,
            ),
        ];

        for (entry, path, dirname, is_dir) in cases {
            assert_eq!(entry.path(), path, "failed on `path` for case: {}", path);
            assert_eq!(entry.dirname(), dirname, "failed on `dirname` for case: {}", path);
            assert_eq!(entry.is_dir(), is_dir, "failed on `is_dir` for case: {}", path);
            assert_eq!(entry.is_file(), !is_dir, "failed on `is_file` for case: {}", path);
        }
    }

    #[test]
    fn test_client_error_message() {
        let err = FSError::client("delete_object", "prefix/file.txt", "boom");
        assert_eq!(err.to_string(), "failed to delete_object at: prefix/file.txt, boom");
        assert!(!err.is_not_found());
        assert!(FSError::not_found("x").is_not_found());
    }
}
