/// Public endpoint for Google Cloud Storage objects.
pub const DEFAULT_STORAGE_API_URI: &str = "https://storage.googleapis.com";

/// How a copy carries access control over to its destination.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CopyAclStrategy {
    /// Copy with the predefined ACL matching the source's visibility.
    #[default]
    Visibility,
    /// Mirror every ACL entry of the source onto the destination.
    Replicate,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdapterConfig {
    pub path_prefix: Option<String>,
    /// Overrides the client's public endpoint in generated URLs. When set,
    /// the bucket name is left out of the URL path.
    pub storage_api_uri: Option<String>,
    pub copy_acl: CopyAclStrategy,
}

impl AdapterConfig {
    pub fn with_path_prefix(mut self, prefix: &str) -> Self {
        self.path_prefix = Some(prefix.to_string());
        self
    }

    pub fn with_storage_api_uri(mut self, uri: &str) -> Self {
        self.storage_api_uri = Some(uri.to_string());
        self
    }

    pub fn with_copy_acl(mut self, strategy: CopyAclStrategy) -> Self {
        self.copy_acl = strategy;
        self
    }
}
