use std::{collections::HashMap, fmt, io::Read, time::Duration};

use time::OffsetDateTime;

use crate::model::fs::FSError;

pub mod gcs;
pub mod mock;
pub mod s3;

/// ACL entity granting access to anyone on the internet.
pub const ALL_USERS: &str = "allUsers";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectInfo {
    pub name: String,
    pub size: u64,
    pub content_type: Option<String>,
    pub updated: Option<OffsetDateTime>,
    pub metadata: Option<HashMap<String, String>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AclRole {
    Owner,
    Reader,
    Writer,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AclEntry {
    pub entity: String,
    pub role: AclRole,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PredefinedAcl {
    AuthenticatedRead,
    BucketOwnerFullControl,
    BucketOwnerRead,
    Private,
    ProjectPrivate,
    PublicRead,
}

impl fmt::Display for PredefinedAcl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PredefinedAcl::AuthenticatedRead => "authenticatedRead",
            PredefinedAcl::BucketOwnerFullControl => "bucketOwnerFullControl",
            PredefinedAcl::BucketOwnerRead => "bucketOwnerRead",
            PredefinedAcl::Private => "private",
            PredefinedAcl::ProjectPrivate => "projectPrivate",
            PredefinedAcl::PublicRead => "publicRead",
        };
        write!(f, "{}", name)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UploadOptions {
    pub predefined_acl: Option<PredefinedAcl>,
    pub metadata: Option<HashMap<String, String>>,
    pub content_type: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SignedUrlMethod {
    #[default]
    Get,
    Put,
    Delete,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignedUrlOptions {
    pub method: SignedUrlMethod,
    pub content_type: Option<String>,
}

pub type ObjectReader = Box<dyn Read + Send>;

/// Bucket-scoped object storage operations. Keys are full bucket keys, any
/// path prefix has already been applied by the caller.
pub trait StorageClient: Send + Sync {
    fn bucket(&self) -> &str;

    /// Public endpoint objects are served from when no custom URI is set.
    fn default_api_uri(&self) -> &str;

    fn upload(&self, key: &str, body: Vec<u8>, options: &UploadOptions)
        -> Result<ObjectInfo, FSError>;

    fn upload_stream(
        &self,
        _key: &str,
        _body: ObjectReader,
        _options: &UploadOptions,
    ) -> Result<ObjectInfo, FSError> {
        Err(FSError::Unsupported {
            operation: "upload_stream",
        })
    }

    /// `Ok(None)` when no object exists at `key`.
    fn get_object(&self, key: &str) -> Result<Option<ObjectInfo>, FSError>;

    fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectInfo>, FSError>;

    /// Whether at least one key starts with `prefix`. Backends override this
    /// with a single-result listing.
    fn has_objects(&self, prefix: &str) -> Result<bool, FSError> {
        Ok(!self.list_objects(prefix)?.is_empty())
    }

    fn download(&self, key: &str) -> Result<Vec<u8>, FSError>;

    fn download_stream(&self, _key: &str) -> Result<ObjectReader, FSError> {
        Err(FSError::Unsupported {
            operation: "download_stream",
        })
    }

    fn copy_object(
        &self,
        source: &str,
        destination: &str,
        predefined_acl: Option<PredefinedAcl>,
    ) -> Result<ObjectInfo, FSError>;

    /// Fails with `FSError::NotFound` when the object does not exist.
    fn delete_object(&self, key: &str) -> Result<(), FSError>;

    /// Fails with `FSError::NotFound` when `entity` has no entry on the object.
    fn get_acl(&self, key: &str, entity: &str) -> Result<AclEntry, FSError>;

    fn list_acl(&self, key: &str) -> Result<Vec<AclEntry>, FSError>;

    /// Adds the entry, or replaces the role of an existing one.
    fn add_acl(&self, key: &str, entity: &str, role: AclRole) -> Result<(), FSError>;

    fn delete_acl(&self, key: &str, entity: &str) -> Result<(), FSError>;

    fn signed_url(
        &self,
        key: &str,
        expires_in: Duration,
        options: &SignedUrlOptions,
    ) -> Result<String, FSError>;
}
