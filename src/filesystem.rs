use std::time::Duration;

use tracing::warn;

use crate::{
    adapters::{ObjectReader, SignedUrlOptions},
    model::fs::{FSError, ListingEntry, Metadata, Visibility, WriteConfig},
};

/// Filesystem operations over a bucket. Every failure is returned as a typed
/// `FSError`.
pub trait Filesystem {
    fn write(&self, path: &str, contents: &[u8], config: &WriteConfig)
        -> Result<Metadata, FSError>;

    fn write_stream(
        &self,
        path: &str,
        contents: ObjectReader,
        config: &WriteConfig,
    ) -> Result<Metadata, FSError>;

    fn read(&self, path: &str) -> Result<Vec<u8>, FSError>;

    fn read_stream(&self, path: &str) -> Result<ObjectReader, FSError>;

    /// The destination gets the source's access control.
    fn copy(&self, source: &str, destination: &str) -> Result<(), FSError>;

    /// Copy then delete. The source is kept when the copy fails.
    fn move_object(&self, source: &str, destination: &str) -> Result<(), FSError>;

    fn delete(&self, path: &str) -> Result<(), FSError>;

    /// Removes every object under `path` and the directory marker itself.
    /// Not transactional: the first failed delete stops the batch.
    fn delete_directory(&self, path: &str) -> Result<(), FSError>;

    fn create_directory(&self, path: &str, config: &WriteConfig) -> Result<Metadata, FSError>;

    fn list_contents(&self, path: &str, recursive: bool) -> Result<Vec<ListingEntry>, FSError>;

    fn file_exists(&self, path: &str) -> Result<bool, FSError>;

    fn directory_exists(&self, path: &str) -> Result<bool, FSError>;

    fn metadata(&self, path: &str) -> Result<Metadata, FSError>;

    fn file_size(&self, path: &str) -> Result<u64, FSError> {
        Ok(self.metadata(path)?.size)
    }

    fn mime_type(&self, path: &str) -> Result<String, FSError> {
        Ok(self.metadata(path)?.mimetype)
    }

    fn last_modified(&self, path: &str) -> Result<i64, FSError> {
        self.metadata(path)?
            .timestamp
            .ok_or_else(|| FSError::MissingAttribute {
                key: path.to_string(),
                attribute: "timestamp",
            })
    }

    fn visibility(&self, path: &str) -> Result<Visibility, FSError>;

    fn set_visibility(&self, path: &str, visibility: Visibility) -> Result<(), FSError>;

    fn url(&self, path: &str) -> Result<String, FSError>;

    fn temporary_url(
        &self,
        path: &str,
        expires_in: Duration,
        options: &SignedUrlOptions,
    ) -> Result<String, FSError>;
}

pub struct ReadRecord {
    pub metadata: Metadata,
    pub contents: Vec<u8>,
}

pub struct StreamRecord {
    pub metadata: Metadata,
    pub stream: ObjectReader,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisibilityRecord {
    pub metadata: Metadata,
    pub visibility: Visibility,
}

/// The older result-style contract: failures are logged and reported as
/// `None` or `false` instead of an error.
pub trait LegacyFilesystem {
    fn write(&self, path: &str, contents: &[u8], config: &WriteConfig) -> Option<Metadata>;

    fn write_stream(
        &self,
        path: &str,
        contents: ObjectReader,
        config: &WriteConfig,
    ) -> Option<Metadata>;

    fn update(&self, path: &str, contents: &[u8], config: &WriteConfig) -> Option<Metadata>;

    fn update_stream(
        &self,
        path: &str,
        contents: ObjectReader,
        config: &WriteConfig,
    ) -> Option<Metadata>;

    fn rename(&self, path: &str, new_path: &str) -> bool;

    fn copy(&self, path: &str, new_path: &str) -> bool;

    fn delete(&self, path: &str) -> bool;

    fn delete_dir(&self, dirname: &str) -> bool;

    fn create_dir(&self, dirname: &str, config: &WriteConfig) -> Option<Metadata>;

    fn has(&self, path: &str) -> bool;

    fn read(&self, path: &str) -> Option<ReadRecord>;

    fn read_stream(&self, path: &str) -> Option<StreamRecord>;

    fn list_contents(&self, directory: &str, recursive: bool) -> Vec<ListingEntry>;

    fn get_metadata(&self, path: &str) -> Option<Metadata>;

    fn get_size(&self, path: &str) -> Option<Metadata>;

    fn get_mimetype(&self, path: &str) -> Option<Metadata>;

    fn get_timestamp(&self, path: &str) -> Option<Metadata>;

    fn get_visibility(&self, path: &str) -> Option<Visibility>;

    fn set_visibility(&self, path: &str, visibility: Visibility) -> Option<VisibilityRecord>;
}

fn legacy<T>(op: &str, path: &str, result: Result<T, FSError>) -> Option<T> {
    match result {
        Err(err) => {
            warn!(error_message=%err, error_group=op, path=path, "legacy call failed");
            None
        }
        Ok(value) => Some(value),
    }
}

impl<F: Filesystem> LegacyFilesystem for F {
    fn write(&self, path: &str, contents: &[u8], config: &WriteConfig) -> Option<Metadata> {
        legacy("write", path, Filesystem::write(self, path, contents, config))
    }

    fn write_stream(
        &self,
        path: &str,
        contents: ObjectReader,
        config: &WriteConfig,
    ) -> Option<Metadata> {
        legacy(
            "write_stream",
            path,
            Filesystem::write_stream(self, path, contents, config),
        )
    }

    fn update(&self, path: &str, contents: &[u8], config: &WriteConfig) -> Option<Metadata> {
        LegacyFilesystem::write(self, path, contents, config)
    }

    fn update_stream(
        &self,
        path: &str,
        contents: ObjectReader,
        config: &WriteConfig,
    ) -> Option<Metadata> {
        LegacyFilesystem::write_stream(self, path, contents, config)
    }

    fn rename(&self, path: &str, new_path: &str) -> bool {
        legacy("rename", path, self.move_object(path, new_path)).is_some()
    }

    fn copy(&self, path: &str, new_path: &str) -> bool {
        legacy("copy", path, Filesystem::copy(self, path, new_path)).is_some()
    }

    fn delete(&self, path: &str) -> bool {
        legacy("delete", path, Filesystem::delete(self, path)).is_some()
    }

    fn delete_dir(&self, dirname: &str) -> bool {
        legacy("delete_dir", dirname, self.delete_directory(dirname)).is_some()
    }

    fn create_dir(&self, dirname: &str, config: &WriteConfig) -> Option<Metadata> {
        legacy("create_dir", dirname, self.create_directory(dirname, config))
    }

    fn has(&self, path: &str) -> bool {
        legacy("has", path, self.file_exists(path)).unwrap_or(false)
    }

    fn read(&self, path: &str) -> Option<ReadRecord> {
        let contents = legacy("read", path, Filesystem::read(self, path))?;
        let metadata = legacy("read", path, self.metadata(path))?;
        Some(ReadRecord { metadata, contents })
    }

    fn read_stream(&self, path: &str) -> Option<StreamRecord> {
        let metadata = legacy("read_stream", path, self.metadata(path))?;
        let stream = legacy("read_stream", path, Filesystem::read_stream(self, path))?;
        Some(StreamRecord { metadata, stream })
    }

    fn list_contents(&self, directory: &str, recursive: bool) -> Vec<ListingEntry> {
        legacy(
            "list_contents",
            directory,
            Filesystem::list_contents(self, directory, recursive),
        )
        .unwrap_or_default()
    }

    fn get_metadata(&self, path: &str) -> Option<Metadata> {
        legacy("get_metadata", path, self.metadata(path))
    }

    fn get_size(&self, path: &str) -> Option<Metadata> {
        self.get_metadata(path)
    }

    fn get_mimetype(&self, path: &str) -> Option<Metadata> {
        self.get_metadata(path)
    }

    fn get_timestamp(&self, path: &str) -> Option<Metadata> {
        self.get_metadata(path)
    }

    fn get_visibility(&self, path: &str) -> Option<Visibility> {
        legacy("get_visibility", path, self.visibility(path))
    }

    fn set_visibility(&self, path: &str, visibility: Visibility) -> Option<VisibilityRecord> {
        legacy(
            "set_visibility",
            path,
            Filesystem::set_visibility(self, path, visibility),
        )?;
        let metadata = legacy("set_visibility", path, self.metadata(path))?;
        Some(VisibilityRecord {
            metadata,
            visibility,
        })
    }
}
