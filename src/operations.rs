use std::{cmp::Reverse, time::Duration};

use tracing::{error, info, span, Level};

use crate::{
    adapters::{self, ObjectReader, SignedUrlOptions},
    config::CopyAclStrategy,
    filesystem::Filesystem,
    fs::ObjectFS,
    model::fs::{FSError, ListingEntry, Metadata, Visibility, WriteConfig},
    util::{listing, path},
};

fn ignore_not_found(result: Result<(), FSError>) -> Result<(), FSError> {
    match result {
        Err(FSError::NotFound { .. }) => Ok(()),
        result => result,
    }
}

impl Filesystem for ObjectFS {
    fn write(
        &self,
        path: &str,
        contents: &[u8],
        config: &WriteConfig,
    ) -> Result<Metadata, FSError> {
        let span = span!(Level::INFO, "write", context = "write");
        let _e = span.enter();
        info!(path = path, size = contents.len(), "called");

        let key = self.apply_prefix(path);
        let object = self
            .client()
            .upload(&key, contents.to_vec(), &self.upload_options(config))
            .inspect_err(|err| error!(error_message=%err, error_group="upload"))?;

        Ok(self.normalise_object(&object))
    }

    fn write_stream(
        &self,
        path: &str,
        contents: ObjectReader,
        config: &WriteConfig,
    ) -> Result<Metadata, FSError> {
        let span = span!(Level::INFO, "write_stream", context = "write_stream");
        let _e = span.enter();
        info!(path = path, "called");

        let key = self.apply_prefix(path);
        let object = self
            .client()
            .upload_stream(&key, contents, &self.upload_options(config))
            .inspect_err(|err| error!(error_message=%err, error_group="upload_stream"))?;

        Ok(self.normalise_object(&object))
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, FSError> {
        let span = span!(Level::INFO, "read", context = "read");
        let _e = span.enter();
        info!(path = path, "called");

        self.client()
            .download(&self.apply_prefix(path))
            .inspect_err(|err| error!(error_message=%err, error_group="download"))
    }

    fn read_stream(&self, path: &str) -> Result<ObjectReader, FSError> {
        let span = span!(Level::INFO, "read_stream", context = "read_stream");
        let _e = span.enter();
        info!(path = path, "called");

        self.client()
            .download_stream(&self.apply_prefix(path))
            .inspect_err(|err| error!(error_message=%err, error_group="download_stream"))
    }

    fn copy(&self, source: &str, destination: &str) -> Result<(), FSError> {
        let span = span!(Level::INFO, "copy", context = "copy");
        let _e = span.enter();
        info!(source = source, destination = destination, strategy = ?self.copy_acl(), "called");

        let source_key = self.apply_prefix(source);
        let destination_key = self.apply_prefix(destination);

        let predefined_acl = match self.copy_acl() {
            CopyAclStrategy::Visibility => {
                let visibility = self
                    .raw_visibility(&source_key)
                    .inspect_err(|err| error!(error_message=%err, error_group="get_acl"))?;
                Some(ObjectFS::predefined_acl_for(visibility))
            }
            CopyAclStrategy::Replicate => None,
        };

        self.client()
            .copy_object(&source_key, &destination_key, predefined_acl)
            .inspect_err(|err| error!(error_message=%err, error_group="copy_object"))?;

        let copied = self
            .client()
            .get_object(&destination_key)
            .inspect_err(|err| error!(error_message=%err, error_group="get_object"))?;

        if copied.is_none() {
            let err = FSError::CopyFailed {
                from: source.to_string(),
                to: destination.to_string(),
            };
            error!(error_message=%err, error_group="copy_object");
            return Err(err);
        }

        if self.copy_acl() == CopyAclStrategy::Replicate {
            self.replicate_acl(&source_key, &destination_key)
                .inspect_err(|err| error!(error_message=%err, error_group="replicate_acl"))?;
        }

        Ok(())
    }

    fn move_object(&self, source: &str, destination: &str) -> Result<(), FSError> {
        let span = span!(Level::INFO, "move", context = "move");
        let _e = span.enter();
        info!(source = source, destination = destination, "called");

        self.copy(source, destination)?;
        self.delete(source)
    }

    fn delete(&self, path: &str) -> Result<(), FSError> {
        let span = span!(Level::INFO, "delete", context = "delete");
        let _e = span.enter();
        info!(path = path, "called");

        self.client()
            .delete_object(&self.apply_prefix(path))
            .inspect_err(|err| error!(error_message=%err, error_group="delete_object"))
    }

    fn delete_directory(&self, path: &str) -> Result<(), FSError> {
        let span = span!(Level::INFO, "delete_directory", context = "delete_directory");
        let _e = span.enter();
        info!(path = path, "called");

        let directory = path.trim_matches('/');
        if directory.is_empty() {
            return Err(FSError::InvalidArgument {
                message: "refusing to delete the root directory".to_string(),
            });
        }

        let dirname = path::normalise_dir_name(directory);
        let mut entries = self.list_contents(&dirname, true)?;

        // files before directories, nested directories before their parents
        entries.sort_by_key(|e| {
            let depth = if e.is_dir() { e.path().matches('/').count() } else { 0 };
            (e.is_dir(), Reverse(depth))
        });

        let mut targets = entries
            .iter()
            .map(|e| {
                if e.is_dir() {
                    path::normalise_dir_name(e.path())
                } else {
                    e.path().to_string()
                }
            })
            .filter(|p| p.starts_with(&dirname))
            .collect::<Vec<_>>();
        targets.push(dirname.clone());

        for target in &targets {
            ignore_not_found(self.client().delete_object(&self.apply_prefix(target)))
                .inspect_err(|err| error!(error_message=%err, error_group="delete_object"))?;
        }

        info!(path = path, deleted = targets.len(), "deleted directory");

        Ok(())
    }

    fn create_directory(&self, path: &str, config: &WriteConfig) -> Result<Metadata, FSError> {
        let span = span!(Level::INFO, "create_directory", context = "create_directory");
        let _e = span.enter();
        info!(path = path, "called");

        if path.trim_matches('/').is_empty() {
            return Err(FSError::InvalidArgument {
                message: "cannot create the root directory".to_string(),
            });
        }

        let key = self.apply_prefix(&path::normalise_dir_name(path.trim_start_matches('/')));
        let object = self
            .client()
            .upload(&key, Vec::new(), &self.upload_options(config))
            .inspect_err(|err| error!(error_message=%err, error_group="upload"))?;

        Ok(self.normalise_object(&object))
    }

    fn list_contents(&self, path: &str, recursive: bool) -> Result<Vec<ListingEntry>, FSError> {
        let span = span!(Level::INFO, "list_contents", context = "list_contents");
        let _e = span.enter();
        info!(path = path, recursive = recursive, "called");

        let directory = path.trim_matches('/');
        let key_prefix = if directory.is_empty() {
            self.apply_prefix("")
        } else {
            path::normalise_dir_name(&self.apply_prefix(directory))
        };

        let objects = self
            .client()
            .list_objects(&key_prefix)
            .inspect_err(|err| error!(error_message=%err, error_group="list_objects"))?;

        let normalised = objects
            .iter()
            .map(|o| ListingEntry::Object(self.normalise_object(o)))
            .collect::<Vec<_>>();

        let below = if directory.is_empty() {
            String::new()
        } else {
            path::normalise_dir_name(directory)
        };

        Ok(listing::emulate_directories(normalised)
            .into_iter()
            .filter(|e| e.path().starts_with(&below) && e.path() != directory)
            .filter(|e| recursive || e.dirname() == directory)
            .collect())
    }

    fn file_exists(&self, path: &str) -> Result<bool, FSError> {
        let span = span!(Level::INFO, "file_exists", context = "file_exists");
        let _e = span.enter();
        info!(path = path, "called");

        Ok(self.client().get_object(&self.apply_prefix(path))?.is_some())
    }

    fn directory_exists(&self, path: &str) -> Result<bool, FSError> {
        let span = span!(Level::INFO, "directory_exists", context = "directory_exists");
        let _e = span.enter();
        info!(path = path, "called");

        let directory = path.trim_matches('/');
        if directory.is_empty() {
            return Ok(true);
        }

        let marker = path::normalise_dir_name(&self.apply_prefix(directory));
        if self.client().get_object(&marker)?.is_some() {
            return Ok(true);
        }

        self.client()
            .has_objects(&marker)
            .inspect_err(|err| error!(error_message=%err, error_group="list_objects"))
    }

    fn metadata(&self, path: &str) -> Result<Metadata, FSError> {
        let span = span!(Level::INFO, "metadata", context = "metadata");
        let _e = span.enter();
        info!(path = path, "called");

        let key = self.apply_prefix(path);
        let object = match self.client().get_object(&key)? {
            Some(object) => Some(object),
            None if !key.ends_with('/') => {
                self.client().get_object(&path::normalise_dir_name(&key))?
            }
            None => None,
        };

        match object {
            Some(object) => Ok(self.normalise_object(&object)),
            None => {
                let err = FSError::not_found(path);
                error!(error_message=%err, error_group="get_object");
                Err(err)
            }
        }
    }

    fn visibility(&self, path: &str) -> Result<Visibility, FSError> {
        let span = span!(Level::INFO, "visibility", context = "visibility");
        let _e = span.enter();
        info!(path = path, "called");

        self.raw_visibility(&self.apply_prefix(path))
            .inspect_err(|err| error!(error_message=%err, error_group="get_acl"))
    }

    fn set_visibility(&self, path: &str, visibility: Visibility) -> Result<(), FSError> {
        let span = span!(Level::INFO, "set_visibility", context = "set_visibility");
        let _e = span.enter();
        info!(path = path, visibility = %visibility, "called");

        let key = self.apply_prefix(path);
        match visibility {
            Visibility::Public => {
                self.client()
                    .add_acl(&key, adapters::ALL_USERS, adapters::AclRole::Reader)
            }
            // a missing allUsers entry is already private, a missing object is not
            Visibility::Private => match self.client().delete_acl(&key, adapters::ALL_USERS) {
                Err(FSError::NotFound { .. }) => match self.client().get_object(&key)? {
                    Some(_) => Ok(()),
                    None => Err(FSError::not_found(path)),
                },
                result => result,
            },
        }
        .inspect_err(|err| error!(error_message=%err, error_group="set_acl"))
    }

    fn url(&self, path: &str) -> Result<String, FSError> {
        Ok(self.object_url(path))
    }

    fn temporary_url(
        &self,
        path: &str,
        expires_in: Duration,
        options: &SignedUrlOptions,
    ) -> Result<String, FSError> {
        let span = span!(Level::INFO, "temporary_url", context = "temporary_url");
        let _e = span.enter();
        info!(path = path, expires_in = expires_in.as_secs(), "called");

        let signed_url = self
            .client()
            .signed_url(&self.apply_prefix(path), expires_in, options)
            .inspect_err(|err| error!(error_message=%err, error_group="signed_url"))?;

        Ok(self.rewrite_signed_url(path, signed_url))
    }
}

#[cfg(test)]
mod tests {
    use std::{io::Read, sync::Arc};

    use super::*;
    use crate::{
        adapters::mock::{Call, MockClient},
        adapters::{PredefinedAcl, SignedUrlMethod, StorageClient},
        config::AdapterConfig,
        model::fs::EntryType,
    };

    fn new_fs(client: MockClient, prefix: Option<&str>) -> (Arc<MockClient>, ObjectFS) {
        let client = Arc::new(client);
        let mut config = AdapterConfig::default();
        if let Some(prefix) = prefix {
            config = config.with_path_prefix(prefix);
        }
        let fs = ObjectFS::new(client.clone(), config);
        (client, fs)
    }

    fn deletes(client: &MockClient) -> Vec<String> {
        client
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete { key } => Some(key),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_write_sends_predefined_acl() {
        let (client, fs) = new_fs(MockClient::new("my-bucket"), Some("prefix"));

        let cases = vec![
            (WriteConfig::default(), PredefinedAcl::ProjectPrivate),
            (
                WriteConfig::default().with_visibility(Visibility::Private),
                PredefinedAcl::ProjectPrivate,
            ),
            (
                WriteConfig::default().with_visibility(Visibility::Public),
                PredefinedAcl::PublicRead,
            ),
        ];

        for (config, expected) in cases {
            client.clear_calls();
            let meta = fs.write("file1.txt", b"contents", &config).unwrap();

            assert_eq!(
                client.calls(),
                vec![Call::Upload {
                    key: "prefix/file1.txt".to_string(),
                    predefined_acl: Some(expected),
                }],
                "failed for case: {}",
                expected
            );
            assert_eq!(meta.kind, EntryType::File);
            assert_eq!(meta.path, "file1.txt");
            assert_eq!(meta.dirname, "");
            assert_eq!(meta.size, 8);
            assert_eq!(meta.timestamp, Some(1474901082));
        }
    }

    #[test]
    fn test_write_stream_then_read() {
        let (_, fs) = new_fs(MockClient::new("my-bucket"), None);

        let meta = fs
            .write_stream(
                "dir/file.txt",
                Box::new(std::io::Cursor::new(b"streamed".to_vec())),
                &WriteConfig::default().with_content_type("text/plain"),
            )
            .unwrap();
        assert_eq!(meta.mimetype, "text/plain");
        assert_eq!(meta.dirname, "dir");

        assert_eq!(fs.read("dir/file.txt").unwrap(), b"streamed".to_vec());

        let mut contents = String::new();
        fs.read_stream("dir/file.txt")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "streamed");
    }

    #[test]
    fn test_streams_unsupported() {
        let (client, fs) = new_fs(MockClient::new("my-bucket").without_streaming(), None);
        client.insert_object("file.txt", b"x", None);

        assert!(matches!(
            fs.read_stream("file.txt"),
            Err(FSError::Unsupported { .. })
        ));
        assert!(matches!(
            fs.write_stream(
                "other.txt",
                Box::new(std::io::Cursor::new(Vec::new())),
                &WriteConfig::default()
            ),
            Err(FSError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_read_missing() {
        let (_, fs) = new_fs(MockClient::new("my-bucket"), None);

        assert!(fs.read("missing.txt").unwrap_err().is_not_found());
    }

    #[test]
    fn test_copy_keeps_visibility() {
        let (client, fs) = new_fs(MockClient::new("my-bucket"), Some("prefix"));
        client.insert_object("prefix/private.txt", b"x", None);
        client.insert_object("prefix/public.txt", b"x", None);
        client
            .add_acl("prefix/public.txt", adapters::ALL_USERS, adapters::AclRole::Reader)
            .unwrap();

        let cases = vec![
            ("private.txt", PredefinedAcl::ProjectPrivate, Visibility::Private),
            ("public.txt", PredefinedAcl::PublicRead, Visibility::Public),
        ];

        for (source, acl, visibility) in cases {
            client.clear_calls();
            let destination = format!("copy-of-{}", source);
            fs.copy(source, &destination).unwrap();

            assert!(
                client.calls().contains(&Call::Copy {
                    source: format!("prefix/{}", source),
                    destination: format!("prefix/{}", destination),
                    predefined_acl: Some(acl),
                }),
                "failed for case: {}",
                source
            );
            assert_eq!(
                fs.visibility(&destination).unwrap(),
                visibility,
                "failed for case: {}",
                source
            );
        }
    }

    #[test]
    fn test_copy_replicates_acl() {
        let client = Arc::new(MockClient::new("my-bucket"));
        let fs = ObjectFS::new(
            client.clone(),
            AdapterConfig::default().with_copy_acl(CopyAclStrategy::Replicate),
        );
        client.insert_object("a.txt", b"x", None);
        client
            .add_acl("a.txt", "user-a@example.com", adapters::AclRole::Reader)
            .unwrap();

        fs.copy("a.txt", "b.txt").unwrap();

        assert!(client.calls().contains(&Call::Copy {
            source: "a.txt".to_string(),
            destination: "b.txt".to_string(),
            predefined_acl: None,
        }));
        assert_eq!(client.acl_of("a.txt"), client.acl_of("b.txt"));
    }

    #[test]
    fn test_copy_without_destination_fails() {
        let (client, fs) = new_fs(MockClient::new("my-bucket").with_dropped_copies(), None);
        client.insert_object("a.txt", b"x", None);

        assert!(matches!(
            fs.copy("a.txt", "b.txt"),
            Err(FSError::CopyFailed { from, to }) if from == "a.txt" && to == "b.txt"
        ));
    }

    #[test]
    fn test_move() {
        let (client, fs) = new_fs(MockClient::new("my-bucket"), Some("prefix"));
        client.insert_object("prefix/a.txt", b"x", None);

        fs.move_object("a.txt", "b.txt").unwrap();

        assert_eq!(client.keys(), vec!["prefix/b.txt".to_string()]);
    }

    #[test]
    fn test_move_keeps_source_when_copy_fails() {
        let (client, fs) = new_fs(MockClient::new("my-bucket").with_dropped_copies(), None);
        client.insert_object("a.txt", b"x", None);

        assert!(fs.move_object("a.txt", "b.txt").is_err());
        assert!(deletes(&client).is_empty());
        assert_eq!(client.keys(), vec!["a.txt".to_string()]);
    }

    #[test]
    fn test_delete() {
        let (client, fs) = new_fs(MockClient::new("my-bucket"), Some("prefix"));
        client.insert_object("prefix/a.txt", b"x", None);

        fs.delete("a.txt").unwrap();

        assert_eq!(deletes(&client), vec!["prefix/a.txt".to_string()]);
        assert!(fs.delete("a.txt").unwrap_err().is_not_found());
    }

    #[test]
    fn test_delete_directory_order() {
        let cases = vec!["dir_name", "dir_name/", "dir_name//", "/dir_name"];

        for case in cases {
            let (client, fs) = new_fs(MockClient::new("my-bucket"), None);
            client.insert_object("dir_name/", b"", None);
            client.insert_object("dir_name/directory1/", b"", None);
            client.insert_object("dir_name/directory1/file1.txt", b"x", None);
            client.insert_object("other/file.txt", b"x", None);

            fs.delete_directory(case).unwrap();

            assert_eq!(
                deletes(&client),
                vec![
                    "dir_name/directory1/file1.txt".to_string(),
                    "dir_name/directory1/".to_string(),
                    "dir_name/".to_string(),
                ],
                "failed for case: {}",
                case
            );
            assert_eq!(client.keys(), vec!["other/file.txt".to_string()]);
        }
    }

    #[test]
    fn test_delete_directory_without_markers() {
        let (client, fs) = new_fs(MockClient::new("my-bucket"), Some("prefix"));
        client.insert_object("prefix/dir/a/b/file.txt", b"x", None);
        client.insert_object("prefix/dir/c.txt", b"x", None);

        fs.delete_directory("dir").unwrap();

        assert_eq!(
            deletes(&client),
            vec![
                "prefix/dir/a/b/file.txt".to_string(),
                "prefix/dir/c.txt".to_string(),
                "prefix/dir/a/b/".to_string(),
                "prefix/dir/a/".to_string(),
                "prefix/dir/".to_string(),
            ]
        );
        assert!(client.keys().is_empty());
    }

    #[test]
    fn test_delete_directory_stops_on_failure() {
        let (client, fs) = new_fs(MockClient::new("my-bucket"), None);
        client.insert_object("dir/a.txt", b"x", None);
        client.insert_object("dir/b.txt", b"x", None);
        client.fail_delete_of("dir/a.txt");

        assert!(matches!(
            fs.delete_directory("dir"),
            Err(FSError::Client { .. })
        ));
        assert_eq!(deletes(&client), vec!["dir/a.txt".to_string()]);
    }

    #[test]
    fn test_delete_root_refused() {
        let (client, fs) = new_fs(MockClient::new("my-bucket"), None);
        client.insert_object("a.txt", b"x", None);

        for case in vec!["", "/", "//"] {
            assert!(
                matches!(fs.delete_directory(case), Err(FSError::InvalidArgument { .. })),
                "failed for case: {}",
                case
            );
        }
        assert_eq!(client.keys(), vec!["a.txt".to_string()]);
    }

    #[test]
    fn test_create_directory() {
        let (client, fs) = new_fs(MockClient::new("my-bucket"), Some("prefix"));

        let cases = vec![("dir", "prefix/dir/"), ("a/b/", "prefix/a/b/"), ("/c//", "prefix/c/")];

        for (path, key) in cases {
            client.clear_calls();
            let meta = fs.create_directory(path, &WriteConfig::default()).unwrap();

            assert_eq!(
                client.calls(),
                vec![Call::Upload {
                    key: key.to_string(),
                    predefined_acl: Some(PredefinedAcl::ProjectPrivate),
                }],
                "failed for case: {}",
                path
            );
            assert_eq!(meta.kind, EntryType::Dir, "failed for case: {}", path);
            assert_eq!(meta.size, 0, "failed for case: {}", path);
        }

        assert!(matches!(
            fs.create_directory("/", &WriteConfig::default()),
            Err(FSError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_list_contents() {
        let (client, fs) = new_fs(MockClient::new("my-bucket"), Some("prefix"));
        client.insert_object("prefix/directory1/", b"", None);
        client.insert_object("prefix/directory1/file1.txt", b"x", Some("text/plain"));
        client.insert_object("prefix/directory2/file1.txt", b"x", Some("text/plain"));
        client.insert_object("outside/file.txt", b"x", None);

        let cases = vec![
            (
                "",
                true,
                vec![
                    "directory1",
                    "directory1/file1.txt",
                    "directory2/file1.txt",
                    "directory2",
                ],
            ),
            ("", false, vec!["directory1", "directory2"]),
            ("/", false, vec!["directory1", "directory2"]),
            ("directory1", true, vec!["directory1/file1.txt"]),
            ("directory2/", false, vec!["directory2/file1.txt"]),
            ("missing", true, vec![]),
        ];

        for (path, recursive, expected) in cases {
            let listing = fs.list_contents(path, recursive).unwrap();
            let paths = listing.iter().map(|e| e.path()).collect::<Vec<_>>();

            assert_eq!(paths, expected, "failed for case: {} {}", path, recursive);
        }

        let listing = fs.list_contents("", true).unwrap();
        assert!(matches!(&listing[0], ListingEntry::Object(meta) if meta.kind == EntryType::Dir));
        assert!(matches!(&listing[3], ListingEntry::Emulated(dir) if dir.basename == "directory2"));
    }

    #[test]
    fn test_list_contents_does_not_match_sibling_prefix() {
        let (client, fs) = new_fs(MockClient::new("my-bucket"), None);
        client.insert_object("dir/a.txt", b"x", None);
        client.insert_object("dir-other/b.txt", b"x", None);

        let listing = fs.list_contents("dir", true).unwrap();

        assert_eq!(
            listing.iter().map(|e| e.path()).collect::<Vec<_>>(),
            vec!["dir/a.txt"]
        );
    }

    #[test]
    fn test_exists() {
        let (client, fs) = new_fs(MockClient::new("my-bucket"), Some("prefix"));
        client.insert_object("prefix/marked/", b"", None);
        client.insert_object("prefix/implied/file.txt", b"x", None);

        let cases = vec![
            ("", true),
            ("/", true),
            ("marked", true),
            ("marked/", true),
            ("implied", true),
            ("implied/file.txt", false),
            ("missing", false),
        ];

        for (path, expected) in cases {
            assert_eq!(
                fs.directory_exists(path).unwrap(),
                expected,
                "failed for case: {}",
                path
            );
        }

        assert!(fs.file_exists("implied/file.txt").unwrap());
        assert!(!fs.file_exists("implied").unwrap());
    }

    #[test]
    fn test_metadata() {
        let (client, fs) = new_fs(MockClient::new("my-bucket"), Some("prefix"));
        client.insert_object("prefix/file.txt", b"hello", Some("text/plain"));
        client.insert_object("prefix/dir/", b"", None);

        let meta = fs.metadata("file.txt").unwrap();
        assert_eq!(meta.size, 5);
        assert_eq!(fs.file_size("file.txt").unwrap(), 5);
        assert_eq!(fs.mime_type("file.txt").unwrap(), "text/plain");
        assert_eq!(fs.last_modified("file.txt").unwrap(), 1474901082);

        let meta = fs.metadata("dir").unwrap();
        assert_eq!(meta.kind, EntryType::Dir);
        assert_eq!(meta.path, "dir");

        assert!(matches!(
            fs.metadata("missing"),
            Err(FSError::NotFound { key }) if key == "missing"
        ));
    }

    #[test]
    fn test_set_visibility() {
        let (client, fs) = new_fs(MockClient::new("my-bucket"), None);
        client.insert_object("a.txt", b"x", None);

        assert_eq!(fs.visibility("a.txt").unwrap(), Visibility::Private);

        fs.set_visibility("a.txt", Visibility::Public).unwrap();
        assert_eq!(fs.visibility("a.txt").unwrap(), Visibility::Public);

        fs.set_visibility("a.txt", Visibility::Private).unwrap();
        assert_eq!(fs.visibility("a.txt").unwrap(), Visibility::Private);

        // already private
        fs.set_visibility("a.txt", Visibility::Private).unwrap();

        assert!(fs
            .set_visibility("missing.txt", Visibility::Public)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_set_visibility_of_missing_object() {
        let (_, fs) = new_fs(MockClient::new("my-bucket"), Some("prefix"));

        let cases = vec![Visibility::Public, Visibility::Private];

        for visibility in cases {
            assert!(
                matches!(
                    fs.set_visibility("missing.txt", visibility),
                    Err(FSError::NotFound { key }) if key.ends_with("missing.txt")
                ),
                "failed for case: {}",
                visibility
            );
        }
    }

    #[test]
    fn test_temporary_url() {
        let (client, mut fs) = new_fs(MockClient::new("my-bucket"), Some("prefix"));
        client.insert_object("prefix/a b.txt", b"x", None);
        let options = SignedUrlOptions {
            method: SignedUrlMethod::Get,
            content_type: None,
        };

        let url = fs
            .temporary_url("a b.txt", Duration::from_secs(60), &options)
            .unwrap();
        assert!(url.starts_with("https://storage.googleapis.com/my-bucket/prefix/a b.txt?"));
        assert!(url.contains("X-Goog-Expires=60"));

        fs.set_storage_api_uri("https://cdn.example.com/");
        let url = fs
            .temporary_url("a b.txt", Duration::from_secs(60), &options)
            .unwrap();
        assert!(url.starts_with("https://cdn.example.com/prefix/a%20b.txt?X-Goog-Method="));
        assert!(url.ends_with("X-Goog-Signature=c2lnbmVk"));
    }

    #[test]
    fn test_url() {
        let (_, fs) = new_fs(MockClient::new("my-bucket"), None);

        assert_eq!(
            fs.url("test folder/file(1).txt").unwrap(),
            "https://storage.googleapis.com/my-bucket/test%20folder/file%281%29.txt"
        );
    }
}
