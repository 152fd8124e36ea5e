use std::{borrow::Cow, sync::Arc, time::Duration};

use futures::{SinkExt, StreamExt};
use google_cloud_storage::{
    client::{Client, ClientConfig},
    http::{
        bucket_access_controls::{BucketACLRole, BucketAccessControl},
        object_access_controls::{
            delete::DeleteObjectAccessControlRequest,
            get::GetObjectAccessControlRequest,
            insert::{InsertObjectAccessControlRequest, ObjectAccessControlCreationConfig},
            list::ListObjectAccessControlsRequest,
            ObjectACLRole, ObjectAccessControl, PredefinedObjectAcl,
        },
        objects::{
            delete::DeleteObjectRequest,
            download::Range,
            get::GetObjectRequest,
            list::ListObjectsRequest,
            rewrite::RewriteObjectRequest,
            upload::{Media, UploadObjectRequest, UploadType},
            Object,
        },
    },
    sign::{SignedURLMethod, SignedURLOptions},
};

use crate::{
    adapters, config,
    model::fs::FSError,
    util::poll::{Blocking, ChunkReader},
};

pub struct GcsClient {
    client: Client,
    bucket: String,
    blocking: Arc<Blocking>,
}

impl GcsClient {
    pub fn new(client: Client, bucket: &str, blocking: Arc<Blocking>) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
            blocking,
        }
    }

    /// Credentials are resolved the usual way: `GOOGLE_APPLICATION_CREDENTIALS`,
    /// then the metadata server.
    pub fn from_env(bucket: &str, blocking: Arc<Blocking>) -> Result<Self, FSError> {
        let config = blocking
            .poll_until_ready_error(ClientConfig::default().with_auth())
            .map_err(|err| FSError::client("load_credentials", bucket, err))?;

        Ok(Self::new(Client::new(config), bucket, blocking))
    }

    fn object_request(&self, key: &str) -> GetObjectRequest {
        GetObjectRequest {
            bucket: self.bucket.clone(),
            object: key.to_string(),
            ..Default::default()
        }
    }

    fn upload_request(&self, options: &adapters::UploadOptions) -> UploadObjectRequest {
        UploadObjectRequest {
            bucket: self.bucket.clone(),
            predefined_acl: options.predefined_acl.map(to_gcs_acl),
            ..Default::default()
        }
    }
}

fn map_error(op: &str, key: &str, err: google_cloud_storage::http::Error) -> FSError {
    match err {
        google_cloud_storage::http::Error::Response(ref res) if res.code == 404 => {
            FSError::not_found(key)
        }
        err => FSError::client(op, key, err),
    }
}

fn to_gcs_acl(acl: adapters::PredefinedAcl) -> PredefinedObjectAcl {
    match acl {
        adapters::PredefinedAcl::AuthenticatedRead => PredefinedObjectAcl::AuthenticatedRead,
        adapters::PredefinedAcl::BucketOwnerFullControl => {
            PredefinedObjectAcl::BucketOwnerFullControl
        }
        adapters::PredefinedAcl::BucketOwnerRead => PredefinedObjectAcl::BucketOwnerRead,
        adapters::PredefinedAcl::Private => PredefinedObjectAcl::Private,
        adapters::PredefinedAcl::ProjectPrivate => PredefinedObjectAcl::ProjectPrivate,
        adapters::PredefinedAcl::PublicRead => PredefinedObjectAcl::PublicRead,
    }
}

fn from_gcs_acl(acl: ObjectAccessControl) -> adapters::AclEntry {
    adapters::AclEntry {
        entity: acl.entity,
        role: match acl.role {
            ObjectACLRole::OWNER => adapters::AclRole::Owner,
            ObjectACLRole::READER => adapters::AclRole::Reader,
        },
    }
}

/// Copies go through the rewrite API, the only one that can set a
/// predefined ACL on the destination.
fn rewrite_request(
    bucket: &str,
    source: &str,
    destination: &str,
    predefined_acl: Option<adapters::PredefinedAcl>,
) -> RewriteObjectRequest {
    RewriteObjectRequest {
        source_bucket: bucket.to_string(),
        source_object: source.to_string(),
        destination_bucket: bucket.to_string(),
        destination_object: destination.to_string(),
        destination_predefined_object_acl: predefined_acl.map(to_gcs_acl),
        ..Default::default()
    }
}

// object ACL listings come back typed as bucket entries
fn from_bucket_acl(acl: BucketAccessControl) -> adapters::AclEntry {
    adapters::AclEntry {
        entity: acl.entity,
        role: match acl.role {
            BucketACLRole::OWNER => adapters::AclRole::Owner,
            BucketACLRole::READER => adapters::AclRole::Reader,
            BucketACLRole::WRITER => adapters::AclRole::Writer,
        },
    }
}

fn to_gcs_role(key: &str, role: adapters::AclRole) -> Result<ObjectACLRole, FSError> {
    match role {
        adapters::AclRole::Owner => Ok(ObjectACLRole::OWNER),
        adapters::AclRole::Reader => Ok(ObjectACLRole::READER),
        adapters::AclRole::Writer => Err(FSError::InvalidArgument {
            message: format!("objects have no writer role: {}", key),
        }),
    }
}

fn to_object_info(obj: Object) -> adapters::ObjectInfo {
    adapters::ObjectInfo {
        name: obj.name,
        size: obj.size.max(0) as u64,
        content_type: obj.content_type,
        updated: obj.updated,
        metadata: obj.metadata,
    }
}

fn upload_type(key: &str, options: &adapters::UploadOptions) -> UploadType {
    if options.metadata.is_some() {
        return UploadType::Multipart(Box::new(Object {
            name: key.to_string(),
            content_type: options.content_type.clone(),
            metadata: options.metadata.clone(),
            ..Default::default()
        }));
    }

    let mut media = Media::new(key.to_string());
    if let Some(content_type) = &options.content_type {
        media.content_type = Cow::Owned(content_type.clone());
    }

    UploadType::Simple(media)
}

impl adapters::StorageClient for GcsClient {
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
        let req = self.upload_request(options);

        let obj = self
            .blocking
            .poll_until_ready_error(self.client.upload_object(
                &req,
                body,
                &upload_type(key, options),
            ))
            .map_err(|err| map_error("upload_object", key, err))?;

        Ok(to_object_info(obj))
    }

    fn upload_stream(
        &self,
        key: &str,
        body: adapters::ObjectReader,
        options: &adapters::UploadOptions,
    ) -> Result<adapters::ObjectInfo, FSError> {
        let req = self.upload_request(options);
        let chunks = self.blocking.read_in_chunks(body);

        let obj = self
            .blocking
            .poll_until_ready_error(self.client.upload_streamed_object(
                &req,
                chunks,
                &upload_type(key, options),
            ))
            .map_err(|err| map_error("upload_streamed_object", key, err))?;

        Ok(to_object_info(obj))
    }

    fn get_object(&self, key: &str) -> Result<Option<adapters::ObjectInfo>, FSError> {
        let req = self.object_request(key);

        match self
            .blocking
            .poll_until_ready_error(self.client.get_object(&req))
        {
            Err(err) => match map_error("get_object", key, err) {
                FSError::NotFound { .. } => Ok(None),
                err => Err(err),
            },
            Ok(obj) => Ok(Some(to_object_info(obj))),
        }
    }

    fn list_objects(&self, prefix: &str) -> Result<Vec<adapters::ObjectInfo>, FSError> {
        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let req = ListObjectsRequest {
                bucket: self.bucket.clone(),
                prefix: Some(prefix.to_string()),
                page_token: continuation_token.clone(),
                ..Default::default()
            };

            let lo = self
                .blocking
                .poll_until_ready_error(self.client.list_objects(&req))
                .map_err(|err| map_error("list_objects", prefix, err))?;

            if let Some(objs) = lo.items {
                objects.extend(objs.into_iter().map(to_object_info));
            }

            continuation_token = lo.next_page_token;
            if continuation_token.is_none() {
                break;
            }
        }

        Ok(objects)
    }

    fn has_objects(&self, prefix: &str) -> Result<bool, FSError> {
        let req = ListObjectsRequest {
            bucket: self.bucket.clone(),
            prefix: Some(prefix.to_string()),
            max_results: Some(1),
            ..Default::default()
        };

        let lo = self
            .blocking
            .poll_until_ready_error(self.client.list_objects(&req))
            .map_err(|err| map_error("list_objects", prefix, err))?;

        Ok(lo.items.is_some_and(|items| !items.is_empty()))
    }

    fn download(&self, key: &str) -> Result<Vec<u8>, FSError> {
        let req = self.object_request(key);

        self.blocking
            .poll_until_ready_error(self.client.download_object(&req, &Range::default()))
            .map_err(|err| map_error("download_object", key, err))
    }

    fn download_stream(&self, key: &str) -> Result<adapters::ObjectReader, FSError> {
        let req = self.object_request(key);
        let client = self.client.clone();
        let owned_key = key.to_string();
        let (mut tx, reader) = ChunkReader::channel();

        self.blocking.spawn(async move {
            let mut stream = match client
                .download_streamed_object(&req, &Range::default())
                .await
            {
                Err(err) => {
                    let _ = tx
                        .send(Err(map_error("download_streamed_object", &owned_key, err)))
                        .await;
                    return;
                }
                Ok(stream) => Box::pin(stream),
            };

            while let Some(chunk) = stream.next().await {
                let item = chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|err| map_error("download_streamed_object", &owned_key, err));
                let failed = item.is_err();
                if tx.send(item).await.is_err() || failed {
                    return;
                }
            }
        });

        Ok(Box::new(reader))
    }

    fn copy_object(
        &self,
        source: &str,
        destination: &str,
        predefined_acl: Option<adapters::PredefinedAcl>,
    ) -> Result<adapters::ObjectInfo, FSError> {
        let mut req = rewrite_request(&self.bucket, source, destination, predefined_acl);

        loop {
            let res = self
                .blocking
                .poll_until_ready_error(self.client.rewrite_object(&req))
                .map_err(|err| map_error("rewrite_object", source, err))?;

            if res.done {
                return match res.resource {
                    Some(obj) => Ok(to_object_info(obj)),
                    None => self
                        .get_object(destination)?
                        .ok_or_else(|| FSError::not_found(destination)),
                };
            }

            match res.rewrite_token {
                Some(token) => req.rewrite_token = Some(token),
                None => {
                    return Err(FSError::client(
                        "rewrite_object",
                        source,
                        "unfinished rewrite without a token",
                    ))
                }
            }
        }
    }

    fn delete_object(&self, key: &str) -> Result<(), FSError> {
        let req = DeleteObjectRequest {
            bucket: self.bucket.clone(),
            object: key.to_string(),
            ..Default::default()
        };

        self.blocking
            .poll_until_ready_error(self.client.delete_object(&req))
            .map_err(|err| map_error("delete_object", key, err))
    }

    fn get_acl(&self, key: &str, entity: &str) -> Result<adapters::AclEntry, FSError> {
        let req = GetObjectAccessControlRequest {
            bucket: self.bucket.clone(),
            object: key.to_string(),
            entity: entity.to_string(),
            generation: None,
        };

        self.blocking
            .poll_until_ready_error(self.client.get_object_access_control(&req))
            .map(from_gcs_acl)
            .map_err(|err| map_error("get_object_access_control", key, err))
    }

    fn list_acl(&self, key: &str) -> Result<Vec<adapters::AclEntry>, FSError> {
        let req = ListObjectAccessControlsRequest {
            bucket: self.bucket.clone(),
            object: key.to_string(),
            generation: None,
        };

        let res = self
            .blocking
            .poll_until_ready_error(self.client.list_object_access_controls(&req))
            .map_err(|err| map_error("list_object_access_controls", key, err))?;

        Ok(res.items.into_iter().map(from_bucket_acl).collect())
    }

    fn add_acl(&self, key: &str, entity: &str, role: adapters::AclRole) -> Result<(), FSError> {
        let req = InsertObjectAccessControlRequest {
            bucket: self.bucket.clone(),
            object: key.to_string(),
            generation: None,
            acl: ObjectAccessControlCreationConfig {
                entity: entity.to_string(),
                role: to_gcs_role(key, role)?,
            },
        };

        self.blocking
            .poll_until_ready_error(self.client.insert_object_access_control(&req))
            .map(|_| ())
            .map_err(|err| map_error("insert_object_access_control", key, err))
    }

    fn delete_acl(&self, key: &str, entity: &str) -> Result<(), FSError> {
        let req = DeleteObjectAccessControlRequest {
            bucket: self.bucket.clone(),
            object: key.to_string(),
            entity: entity.to_string(),
            generation: None,
        };

        self.blocking
            .poll_until_ready_error(self.client.delete_object_access_control(&req))
            .map_err(|err| map_error("delete_object_access_control", key, err))
    }

    fn signed_url(
        &self,
        key: &str,
        expires_in: Duration,
        options: &adapters::SignedUrlOptions,
    ) -> Result<String, FSError> {
        let opts = SignedURLOptions {
            method: match options.method {
                adapters::SignedUrlMethod::Get => SignedURLMethod::GET,
                adapters::SignedUrlMethod::Put => SignedURLMethod::PUT,
                adapters::SignedUrlMethod::Delete => SignedURLMethod::DELETE,
            },
            expires: expires_in,
            content_type: options.content_type.clone(),
            ..Default::default()
        };

        self.blocking
            .poll_until_ready_error(self.client.signed_url(&self.bucket, key, None, None, opts))
            .map_err(|err| FSError::client("signed_url", key, err))
    }
}
