use std::{
    collections::{BTreeMap, HashSet},
    io::{Cursor, Read},
    sync::Mutex,
    time::Duration,
};

use time::OffsetDateTime;

use crate::{adapters, config, model::fs::FSError};

const PROJECT_OWNERS: &str = "project-owners";
const MOCK_UPDATED: i64 = 1474901082;

/// A storage call as seen by the mock, in the order it was made.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Upload {
        key: String,
        predefined_acl: Option<adapters::PredefinedAcl>,
    },
    GetObject {
        key: String,
    },
    ListObjects {
        prefix: String,
    },
    Download {
        key: String,
    },
    Copy {
        source: String,
        destination: String,
        predefined_acl: Option<adapters::PredefinedAcl>,
    },
    Delete {
        key: String,
    },
    GetAcl {
        key: String,
        entity: String,
    },
    ListAcl {
        key: String,
    },
    AddAcl {
        key: String,
        entity: String,
        role: adapters::AclRole,
    },
    DeleteAcl {
        key: String,
        entity: String,
    },
    SignedUrl {
        key: String,
    },
}

#[derive(Clone, Debug)]
struct MockObject {
    body: Vec<u8>,
    content_type: Option<String>,
    metadata: Option<std::collections::HashMap<String, String>>,
    acl: Vec<adapters::AclEntry>,
}

/// In-memory bucket recording every call made against it.
pub struct MockClient {
    bucket: String,
    streaming: bool,
    drop_copies: bool,
    timestamps: bool,
    objects: Mutex<BTreeMap<String, MockObject>>,
    failing_deletes: Mutex<HashSet<String>>,
    calls: Mutex<Vec<Call>>,
}

impl MockClient {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            streaming: true,
            drop_copies: false,
            timestamps: true,
            objects: Mutex::new(BTreeMap::new()),
            failing_deletes: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn without_streaming(mut self) -> Self {
        self.streaming = false;
        self
    }

    /// Copies report success but never create the destination.
    pub fn with_dropped_copies(mut self) -> Self {
        self.drop_copies = true;
        self
    }

    /// Objects come back without an update time.
    pub fn without_timestamps(mut self) -> Self {
        self.timestamps = false;
        self
    }

    pub fn fail_delete_of(&self, key: &str) {
        lock(&self.failing_deletes).insert(key.to_string());
    }

    /// Seeds an object with no ACL entries beyond the owner's.
    pub fn insert_object(&self, key: &str, body: &[u8], content_type: Option<&str>) {
        lock(&self.objects).insert(
            key.to_string(),
            MockObject {
                body: body.to_vec(),
                content_type: content_type.map(|c| c.to_string()),
                metadata: None,
                acl: acl_for(None),
            },
        );
    }

    pub fn keys(&self) -> Vec<String> {
        lock(&self.objects).keys().cloned().collect()
    }

    pub fn acl_of(&self, key: &str) -> Option<Vec<adapters::AclEntry>> {
        lock(&self.objects).get(key).map(|o| o.acl.clone())
    }

    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    fn record(&self, call: Call) {
        lock(&self.calls).push(call);
    }

    fn info(&self, key: &str, object: &MockObject) -> adapters::ObjectInfo {
        adapters::ObjectInfo {
            name: key.to_string(),
            size: object.body.len() as u64,
            content_type: object.content_type.clone(),
            updated: if self.timestamps {
                OffsetDateTime::from_unix_timestamp(MOCK_UPDATED).ok()
            } else {
                None
            },
            metadata: object.metadata.clone(),
        }
    }

    fn store(
        &self,
        key: &str,
        body: Vec<u8>,
        options: &adapters::UploadOptions,
    ) -> adapters::ObjectInfo {
        self.record(Call::Upload {
            key: key.to_string(),
            predefined_acl: options.predefined_acl,
        });

        let object = MockObject {
            body,
            content_type: Some(
                options
                    .content_type
                    .clone()
                    .unwrap_or_else(|| "application/octet-stream".to_string()),
            ),
            metadata: options.metadata.clone(),
            acl: acl_for(options.predefined_acl),
        };
        let info = self.info(key, &object);
        lock(&self.objects).insert(key.to_string(), object);

        info
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn acl_for(predefined_acl: Option<adapters::PredefinedAcl>) -> Vec<adapters::AclEntry> {
    let mut acl = vec![adapters::AclEntry {
        entity: PROJECT_OWNERS.to_string(),
        role: adapters::AclRole::Owner,
    }];

    match predefined_acl {
        Some(adapters::PredefinedAcl::PublicRead) => acl.push(adapters::AclEntry {
            entity: adapters::ALL_USERS.to_string(),
            role: adapters::AclRole::Reader,
        }),
        Some(adapters::PredefinedAcl::AuthenticatedRead) => acl.push(adapters::AclEntry {
            entity: "allAuthenticatedUsers".to_string(),
            role: adapters::AclRole::Reader,
        }),
        _ => {}
    }

    acl
}

impl adapters::StorageClient for MockClient {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn default_api_uri(&self) -> &str {
        config::DEFAULT_STORAGE_API_URI
    }

    fn upload(
        &self,
        key: &str,
        body: Vec<u8>,
        options: &adapters::UploadOptions,
    ) -> Result<adapters::ObjectInfo, FSError> {
        Ok(self.store(key, body, options))
    }

    fn upload_stream(
        &self,
        key: &str,
        mut body: adapters::ObjectReader,
        options: &adapters::UploadOptions,
    ) -> Result<adapters::ObjectInfo, FSError> {
        if !self.streaming {
            return Err(FSError::Unsupported {
                operation: "upload_stream",
            });
        }

        let mut bytes = Vec::new();
        body.read_to_end(&mut bytes)?;

        Ok(self.store(key, bytes, options))
    }

    fn get_object(&self, key: &str) -> Result<Option<adapters::ObjectInfo>, FSError> {
        self.record(Call::GetObject {
            key: key.to_string(),
        });

        Ok(lock(&self.objects).get(key).map(|o| self.info(key, o)))
    }

    fn list_objects(&self, prefix: &str) -> Result<Vec<adapters::ObjectInfo>, FSError> {
        self.record(Call::ListObjects {
            prefix: prefix.to_string(),
        });

        Ok(lock(&self.objects)
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, o)| self.info(key, o))
            .collect())
    }

    fn download(&self, key: &str) -> Result<Vec<u8>, FSError> {
        self.record(Call::Download {
            key: key.to_string(),
        });

        lock(&self.objects)
            .get(key)
            .map(|o| o.body.clone())
            .ok_or_else(|| FSError::not_found(key))
    }

    fn download_stream(&self, key: &str) -> Result<adapters::ObjectReader, FSError> {
        if !self.streaming {
            return Err(FSError::Unsupported {
                operation: "download_stream",
            });
        }

        let bytes = self.download(key)?;
        Ok(Box::new(Cursor::new(bytes)))
    }

    fn copy_object(
        &self,
        source: &str,
        destination: &str,
        predefined_acl: Option<adapters::PredefinedAcl>,
    ) -> Result<adapters::ObjectInfo, FSError> {
        self.record(Call::Copy {
            source: source.to_string(),
            destination: destination.to_string(),
            predefined_acl,
        });

        let mut objects = lock(&self.objects);
        let mut object = objects
            .get(source)
            .cloned()
            .ok_or_else(|| FSError::not_found(source))?;
        object.acl = acl_for(predefined_acl);

        let info = self.info(destination, &object);
        if !self.drop_copies {
            objects.insert(destination.to_string(), object);
        }

        Ok(info)
    }

    fn delete_object(&self, key: &str) -> Result<(), FSError> {
        self.record(Call::Delete {
            key: key.to_string(),
        });

        if lock(&self.failing_deletes).contains(key) {
            return Err(FSError::client("delete_object", key, "injected failure"));
        }

        lock(&self.objects)
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| FSError::not_found(key))
    }

    fn get_acl(&self, key: &str, entity: &str) -> Result<adapters::AclEntry, FSError> {
        self.record(Call::GetAcl {
            key: key.to_string(),
            entity: entity.to_string(),
        });

        lock(&self.objects)
            .get(key)
            .and_then(|o| o.acl.iter().find(|e| e.entity == entity).cloned())
            .ok_or_else(|| FSError::not_found(key))
    }

    fn list_acl(&self, key: &str) -> Result<Vec<adapters::AclEntry>, FSError> {
        self.record(Call::ListAcl {
            key: key.to_string(),
        });

        lock(&self.objects)
            .get(key)
            .map(|o| o.acl.clone())
            .ok_or_else(|| FSError::not_found(key))
    }

    fn add_acl(&self, key: &str, entity: &str, role: adapters::AclRole) -> Result<(), FSError> {
        self.record(Call::AddAcl {
            key: key.to_string(),
            entity: entity.to_string(),
            role,
        });

        let mut objects = lock(&self.objects);
        let object = objects.get_mut(key).ok_or_else(|| FSError::not_found(key))?;
        object.acl.retain(|e| e.entity != entity);
        object.acl.push(adapters::AclEntry {
            entity: entity.to_string(),
            role,
        });

        Ok(())
    }

    fn delete_acl(&self, key: &str, entity: &str) -> Result<(), FSError> {
        self.record(Call::DeleteAcl {
            key: key.to_string(),
            entity: entity.to_string(),
        });

        let mut objects = lock(&self.objects);
        let object = objects.get_mut(key).ok_or_else(|| FSError::not_found(key))?;
        let before = object.acl.len();
        object.acl.retain(|e| e.entity != entity);
        if object.acl.len() == before {
            return Err(FSError::not_found(key));
        }

        Ok(())
    }

    fn signed_url(
        &self,
        key: &str,
        expires_in: Duration,
        options: &adapters::SignedUrlOptions,
    ) -> Result<String, FSError> {
        self.record(Call::SignedUrl {
            key: key.to_string(),
        });

        Ok(format!(
            "{}/{}/{}?X-Goog-Method={:?}&X-Goog-Expires={}&X-Goog-Signature=c2lnbmVk",
            config::DEFAULT_STORAGE_API_URI,
            self.bucket,
            key,
            options.method,
            expires_in.as_secs()
        ))
    }
}
