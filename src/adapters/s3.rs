use std::{sync::Arc, time::Duration};

use aws_sdk_s3::{
    error::{DisplayErrorContext, ProvideErrorMetadata},
    presigning::PresigningConfig,
    primitives::ByteStream,
    types::{Grant, ObjectCannedAcl, Permission, Type},
};
use time::OffsetDateTime;

use crate::{
    adapters,
    model::fs::FSError,
    util::{path, poll::Blocking},
};

pub const S3_API_URI: &str = "https://s3.amazonaws.com";

const ALL_USERS_URI: &str = "http://acs.amazonaws.com/groups/global/AllUsers";
const AUTHENTICATED_USERS_URI: &str = "http://acs.amazonaws.com/groups/global/AuthenticatedUsers";
const NOT_FOUND_CODES: [&str; 3] = ["NoSuchKey", "NotFound", "NoSuchObject"];

/// S3 only knows canned ACLs and whole-policy rewrites, so entity-level ACL
/// edits are limited to the public-read grant.
pub struct S3Client {
    client: aws_sdk_s3::Client,
    bucket: String,
    blocking: Arc<Blocking>,
}

impl S3Client {
    pub fn new(client: aws_sdk_s3::Client, bucket: &str, blocking: Arc<Blocking>) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
            blocking,
        }
    }

    pub fn from_env(bucket: &str, blocking: Arc<Blocking>) -> Self {
        let config = blocking.poll_until_ready(aws_config::load_from_env());
        Self::new(aws_sdk_s3::Client::new(&config), bucket, blocking)
    }

    fn head(&self, key: &str) -> Result<Option<adapters::ObjectInfo>, FSError> {
        let req = self.client.head_object().bucket(&self.bucket).key(key);

        let ho = match self.blocking.poll_until_ready_error(req.send()) {
            Err(err) => {
                if let Some(svc_err) = err.as_service_error() {
                    if svc_err.is_not_found() {
                        return Ok(None);
                    }
                }

                return Err(FSError::client(
                    "head_object",
                    key,
                    DisplayErrorContext(&err),
                ));
            }
            Ok(ho) => ho,
        };

        Ok(Some(adapters::ObjectInfo {
            name: key.to_string(),
            size: ho.content_length().unwrap_or(0).max(0) as u64,
            content_type: ho.content_type().map(|c| c.to_string()),
            updated: ho.last_modified().and_then(to_offset_date_time),
            metadata: ho.metadata().cloned(),
        }))
    }

    fn put_canned_acl(&self, key: &str, acl: ObjectCannedAcl) -> Result<(), FSError> {
        let req = self
            .client
            .put_object_acl()
            .bucket(&self.bucket)
            .key(key)
            .acl(acl);

        self.blocking
            .poll_until_ready_error(req.send())
            .map(|_| ())
            .map_err(|err| map_error("put_object_acl", key, err))
    }
}

fn map_error<E>(op: &str, key: &str, err: aws_sdk_s3::error::SdkError<E>) -> FSError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let not_found = err
        .as_service_error()
        .and_then(|svc_err| svc_err.code())
        .map(|code| NOT_FOUND_CODES.contains(&code))
        .unwrap_or(false);

    if not_found {
        FSError::not_found(key)
    } else {
        FSError::client(op, key, DisplayErrorContext(&err))
    }
}

fn to_offset_date_time(dt: &aws_sdk_s3::primitives::DateTime) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(dt.secs()).ok()
}

fn to_canned_acl(acl: adapters::PredefinedAcl) -> ObjectCannedAcl {
    match acl {
        adapters::PredefinedAcl::AuthenticatedRead => ObjectCannedAcl::AuthenticatedRead,
        adapters::PredefinedAcl::BucketOwnerFullControl => ObjectCannedAcl::BucketOwnerFullControl,
        adapters::PredefinedAcl::BucketOwnerRead => ObjectCannedAcl::BucketOwnerRead,
        adapters::PredefinedAcl::Private | adapters::PredefinedAcl::ProjectPrivate => {
            ObjectCannedAcl::Private
        }
        adapters::PredefinedAcl::PublicRead => ObjectCannedAcl::PublicRead,
    }
}

fn grant_entity(grant: &Grant) -> Option<String> {
    let grantee = grant.grantee()?;
    match grantee.r#type() {
        Type::Group => match grantee.uri()? {
            ALL_USERS_URI => Some(adapters::ALL_USERS.to_string()),
            AUTHENTICATED_USERS_URI => Some("allAuthenticatedUsers".to_string()),
            uri => Some(format!("group-{}", uri)),
        },
        Type::CanonicalUser => grantee.id().map(|id| format!("user-{}", id)),
        Type::AmazonCustomerByEmail => grantee
            .email_address()
            .map(|email| format!("user-{}", email)),
        _ => None,
    }
}

fn grant_role(grant: &Grant) -> Option<adapters::AclRole> {
    match grant.permission()? {
        Permission::FullControl | Permission::WriteAcp => Some(adapters::AclRole::Owner),
        Permission::Write => Some(adapters::AclRole::Writer),
        Permission::Read | Permission::ReadAcp => Some(adapters::AclRole::Reader),
        _ => None,
    }
}

fn to_acl_entries(grants: &[Grant]) -> Vec<adapters::AclEntry> {
    grants
        .iter()
        .filter_map(|grant| {
            Some(adapters::AclEntry {
                entity: grant_entity(grant)?,
                role: grant_role(grant)?,
            })
        })
        .collect()
}

impl adapters::StorageClient for S3Client {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn default_api_uri(&self) -> &str {
        S3_API_URI
    }

    fn upload(
        &self,
        key: &str,
        body: Vec<u8>,
        options: &adapters::UploadOptions,
    ) -> Result<adapters::ObjectInfo, FSError> {
        let req = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .set_acl(options.predefined_acl.map(to_canned_acl))
            .set_content_type(options.content_type.clone())
            .set_metadata(options.metadata.clone());

        self.blocking
            .poll_until_ready_error(req.send())
            .map_err(|err| map_error("put_object", key, err))?;

        self.head(key)?.ok_or_else(|| FSError::not_found(key))
    }

    fn get_object(&self, key: &str) -> Result<Option<adapters::ObjectInfo>, FSError> {
        self.head(key)
    }

    fn list_objects(&self, prefix: &str) -> Result<Vec<adapters::ObjectInfo>, FSError> {
        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut req = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);

            if let Some(tok) = continuation_token {
                req = req.continuation_token(tok);
            }

            let lo = self
                .blocking
                .poll_until_ready_error(req.send())
                .map_err(|err| map_error("list_objects", prefix, err))?;

            for o in lo.contents() {
                objects.push(adapters::ObjectInfo {
                    name: o.key().unwrap_or("").to_string(),
                    size: o.size().unwrap_or(0).max(0) as u64,
                    content_type: None,
                    updated: o.last_modified().and_then(to_offset_date_time),
                    metadata: None,
                });
            }

            continuation_token = lo.next_continuation_token().map(|tok| tok.to_string());
            if continuation_token.is_none() {
                break;
            }
        }

        Ok(objects)
    }

    fn has_objects(&self, prefix: &str) -> Result<bool, FSError> {
        let req = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .max_keys(1);

        let lo = self
            .blocking
            .poll_until_ready_error(req.send())
            .map_err(|err| map_error("list_objects", prefix, err))?;

        Ok(!lo.contents().is_empty())
    }

    fn download(&self, key: &str) -> Result<Vec<u8>, FSError> {
        let req = self.client.get_object().bucket(&self.bucket).key(key);

        let o = self
            .blocking
            .poll_until_ready_error(req.send())
            .map_err(|err| map_error("get_object", key, err))?;

        let bytes = self
            .blocking
            .poll_until_ready_error(o.body.collect())
            .map_err(|err| FSError::client("collect_body", key, err))?;

        Ok(bytes.into_bytes().to_vec())
    }

    fn copy_object(
        &self,
        source: &str,
        destination: &str,
        predefined_acl: Option<adapters::PredefinedAcl>,
    ) -> Result<adapters::ObjectInfo, FSError> {
        let req = self
            .client
            .copy_object()
            .bucket(&self.bucket)
            .key(destination)
            .copy_source(format!(
                "{}/{}",
                self.bucket,
                path::encode_url_path(source)
            ))
            .set_acl(predefined_acl.map(to_canned_acl));

        self.blocking
            .poll_until_ready_error(req.send())
            .map_err(|err| map_error("copy_object", source, err))?;

        Ok(adapters::ObjectInfo {
            name: destination.to_string(),
            ..Default::default()
        })
    }

    fn delete_object(&self, key: &str) -> Result<(), FSError> {
        let req = self.client.delete_object().bucket(&self.bucket).key(key);

        self.blocking
            .poll_until_ready_error(req.send())
            .map(|_| ())
            .map_err(|err| map_error("delete_object", key, err))
    }

    fn get_acl(&self, key: &str, entity: &str) -> Result<adapters::AclEntry, FSError> {
        self.list_acl(key)?
            .into_iter()
            .find(|e| e.entity == entity)
            .ok_or_else(|| FSError::not_found(key))
    }

    fn list_acl(&self, key: &str) -> Result<Vec<adapters::AclEntry>, FSError> {
        let req = self.client.get_object_acl().bucket(&self.bucket).key(key);

        let acl = self
            .blocking
            .poll_until_ready_error(req.send())
            .map_err(|err| map_error("get_object_acl", key, err))?;

        Ok(to_acl_entries(acl.grants()))
    }

    fn add_acl(&self, key: &str, entity: &str, role: adapters::AclRole) -> Result<(), FSError> {
        if entity != adapters::ALL_USERS || role != adapters::AclRole::Reader {
            return Err(FSError::Unsupported { operation: "add_acl" });
        }

        self.put_canned_acl(key, ObjectCannedAcl::PublicRead)
    }

    fn delete_acl(&self, key: &str, entity: &str) -> Result<(), FSError> {
        if entity != adapters::ALL_USERS {
            return Err(FSError::Unsupported {
                operation: "delete_acl",
            });
        }

        self.put_canned_acl(key, ObjectCannedAcl::Private)
    }

    fn signed_url(
        &self,
        key: &str,
        expires_in: Duration,
        options: &adapters::SignedUrlOptions,
    ) -> Result<String, FSError> {
        let config = PresigningConfig::expires_in(expires_in)
            .map_err(|err| FSError::client("presign", key, err))?;

        let presigned = match options.method {
            adapters::SignedUrlMethod::Get => self
                .blocking
                .poll_until_ready_error(
                    self.client
                        .get_object()
                        .bucket(&self.bucket)
                        .key(key)
                        .presigned(config),
                )
                .map_err(|err| map_error("presign_get_object", key, err))?,
            adapters::SignedUrlMethod::Put => self
                .blocking
                .poll_until_ready_error(
                    self.client
                        .put_object()
                        .bucket(&self.bucket)
                        .key(key)
                        .set_content_type(options.content_type.clone())
                        .presigned(config),
                )
                .map_err(|err| map_error("presign_put_object", key, err))?,
            adapters::SignedUrlMethod::Delete => self
                .blocking
                .poll_until_ready_error(
                    self.client
                        .delete_object()
                        .bucket(&self.bucket)
                        .key(key)
                        .presigned(config),
                )
                .map_err(|err| map_error("presign_delete_object", key, err))?,
        };

        Ok(presigned.uri().to_string())
    }
}
