use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    adapters::{self, StorageClient},
    config::{AdapterConfig, CopyAclStrategy},
    model::fs::{EntryType, FSError, Metadata, Visibility, WriteConfig},
    util::path::{self, PathPrefixer},
};

/// Filesystem view over one bucket.
///
/// Caller paths never carry the configured prefix: it is applied on the way
/// into the storage client and stripped from everything coming back.
pub struct ObjectFS {
    client: Arc<dyn StorageClient>,
    prefixer: PathPrefixer,
    storage_api_uri: Option<String>,
    copy_acl: CopyAclStrategy,
}

impl ObjectFS {
    pub fn new(client: Arc<dyn StorageClient>, config: AdapterConfig) -> Self {
        Self {
            client,
            prefixer: PathPrefixer::new(config.path_prefix.as_deref()),
            storage_api_uri: config.storage_api_uri,
            copy_acl: config.copy_acl,
        }
    }

    pub fn client(&self) -> &dyn StorageClient {
        self.client.as_ref()
    }

    pub fn bucket(&self) -> &str {
        self.client.bucket()
    }

    pub fn path_prefix(&self) -> &str {
        self.prefixer.prefix()
    }

    pub fn set_path_prefix(&mut self, prefix: Option<&str>) {
        self.prefixer = PathPrefixer::new(prefix);
    }

    pub fn storage_api_uri(&self) -> &str {
        self.storage_api_uri
            .as_deref()
            .unwrap_or_else(|| self.client.default_api_uri())
    }

    pub fn set_storage_api_uri(&mut self, uri: &str) {
        self.storage_api_uri = Some(uri.to_string());
    }

    pub fn copy_acl(&self) -> CopyAclStrategy {
        self.copy_acl
    }

    pub fn apply_prefix(&self, path: &str) -> String {
        self.prefixer.apply_prefix(path)
    }

    pub fn remove_prefix<'a>(&self, key: &'a str) -> &'a str {
        self.prefixer.remove_prefix(key)
    }

    pub fn normalise_object(&self, object: &adapters::ObjectInfo) -> Metadata {
        let name = self.remove_prefix(&object.name);
        let is_dir = name.ends_with(path::SEPARATOR);
        let name = if is_dir {
            name.trim_end_matches(path::SEPARATOR)
        } else {
            name
        };

        Metadata {
            kind: if is_dir { EntryType::Dir } else { EntryType::File },
            path: name.to_string(),
            dirname: path::dirname(name).to_string(),
            timestamp: object.updated.map(|t| t.unix_timestamp()),
            mimetype: object.content_type.clone().unwrap_or_default(),
            size: object.size,
        }
    }

    pub fn predefined_acl_for(visibility: Visibility) -> adapters::PredefinedAcl {
        match visibility {
            Visibility::Public => adapters::PredefinedAcl::PublicRead,
            Visibility::Private => adapters::PredefinedAcl::ProjectPrivate,
        }
    }

    /// Objects written without an ACL are unreachable from the storage
    /// console, so a predefined ACL is always sent.
    pub fn upload_options(&self, config: &WriteConfig) -> adapters::UploadOptions {
        adapters::UploadOptions {
            predefined_acl: Some(Self::predefined_acl_for(
                config.visibility.unwrap_or(Visibility::Private),
            )),
            metadata: config.metadata.clone(),
            content_type: config.content_type.clone(),
        }
    }

    /// Visibility of the object at the already-prefixed `key`.
    pub fn raw_visibility(&self, key: &str) -> Result<Visibility, FSError> {
        match self.client.get_acl(key, adapters::ALL_USERS) {
            Err(FSError::NotFound { .. }) => Ok(Visibility::Private),
            Err(err) => Err(err),
            Ok(entry) if entry.role == adapters::AclRole::Reader => Ok(Visibility::Public),
            Ok(_) => Ok(Visibility::Private),
        }
    }

    /// Makes the ACL of `destination` match the one of `source`, entry by entry.
    pub fn replicate_acl(&self, source: &str, destination: &str) -> Result<(), FSError> {
        let wanted = self.client.list_acl(source)?;
        let current = self.client.list_acl(destination)?;

        for entry in &current {
            if !wanted.iter().any(|w| w.entity == entry.entity) {
                match self.client.delete_acl(destination, &entry.entity) {
                    Err(FSError::NotFound { .. }) | Ok(()) => {}
                    Err(err) => return Err(err),
                }
            }
        }

        for entry in &wanted {
            if !current.contains(entry) {
                self.client.add_acl(destination, &entry.entity, entry.role)?;
            }
        }

        info!(
            source = source,
            destination = destination,
            entries = wanted.len(),
            "replicated acl"
        );

        Ok(())
    }

    /// Public URL of `path`; the bucket only appears when the client's own
    /// endpoint is used.
    pub fn object_url(&self, path: &str) -> String {
        let uri = self.storage_api_uri().trim_end_matches('/');
        let encoded = path::encode_url_path(&self.apply_prefix(path));

        if self.uses_default_api_uri() {
            format!("{}/{}/{}", uri, self.bucket(), encoded)
        } else {
            format!("{}/{}", uri, encoded)
        }
    }

    /// Swaps the endpoint of a signed URL for the custom one, keeping the
    /// signature query untouched.
    pub fn rewrite_signed_url(&self, path: &str, signed_url: String) -> String {
        if self.uses_default_api_uri() {
            return signed_url;
        }

        match signed_url.split_once('?') {
            Some((_, params)) => format!("{}?{}", self.object_url(path), params),
            None => {
                warn!(path = path, "signed url without query");
                self.object_url(path)
            }
        }
    }

    fn uses_default_api_uri(&self) -> bool {
        match &self.storage_api_uri {
            None => true,
            Some(uri) => uri == self.client.default_api_uri(),
        }
    }
}
