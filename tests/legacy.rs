use std::{io::Read, sync::Arc};

use bucketfs::{
    adapters::{mock::MockClient, StorageClient},
    AdapterConfig, LegacyFilesystem, ObjectFS, Visibility, WriteConfig,
};

fn new_fs() -> (Arc<MockClient>, ObjectFS) {
    let client = Arc::new(MockClient::new("my-bucket"));
    let fs = ObjectFS::new(
        client.clone(),
        AdapterConfig::default().with_path_prefix("prefix"),
    );
    (client, fs)
}

#[test]
fn test_write_read_delete() {
    let (client, fs) = new_fs();

    let meta = fs
        .write("dir/file.txt", b"hello", &WriteConfig::default())
        .unwrap();
    assert_eq!(meta.path, "dir/file.txt");
    assert!(fs.has("dir/file.txt"));

    let record = fs.read("dir/file.txt").unwrap();
    assert_eq!(record.contents, b"hello".to_vec());
    assert_eq!(record.metadata.size, 5);

    let mut stream = fs.read_stream("dir/file.txt").unwrap();
    let mut contents = String::new();
    stream.stream.read_to_string(&mut contents).unwrap();
    assert_eq!(contents, "hello");

    assert!(fs.delete("dir/file.txt"));
    assert!(!fs.has("dir/file.txt"));
    assert!(!fs.delete("dir/file.txt"));
    assert!(client.keys().is_empty());
}

#[test]
fn test_failures_are_reported_as_absent() {
    let (_, fs) = new_fs();

    let cases = vec!["missing.txt", "dir/missing.txt"];

    for case in cases {
        assert!(fs.read(case).is_none(), "failed for case: {}", case);
        assert!(fs.get_metadata(case).is_none(), "failed for case: {}", case);
        assert!(fs.get_size(case).is_none(), "failed for case: {}", case);
        assert!(!fs.rename(case, "elsewhere.txt"), "failed for case: {}", case);
        assert!(!fs.copy(case, "elsewhere.txt"), "failed for case: {}", case);
        assert!(
            fs.set_visibility(case, Visibility::Public).is_none(),
            "failed for case: {}",
            case
        );
    }
}

#[test]
fn test_update_overwrites() {
    let (_, fs) = new_fs();

    fs.write("a.txt", b"one", &WriteConfig::default()).unwrap();
    let meta = fs.update("a.txt", b"three", &WriteConfig::default()).unwrap();

    assert_eq!(meta.size, 5);
    assert_eq!(fs.read("a.txt").unwrap().contents, b"three".to_vec());
}

#[test]
fn test_rename_and_copy() {
    let (client, fs) = new_fs();
    fs.write(
        "a.txt",
        b"x",
        &WriteConfig::default().with_visibility(Visibility::Public),
    )
    .unwrap();

    assert!(fs.copy("a.txt", "b.txt"));
    assert!(fs.rename("b.txt", "c.txt"));

    assert_eq!(
        client.keys(),
        vec!["prefix/a.txt".to_string(), "prefix/c.txt".to_string()]
    );
    assert_eq!(fs.get_visibility("c.txt"), Some(Visibility::Public));
}

#[test]
fn test_directories() {
    let (client, fs) = new_fs();
    fs.create_dir("dir", &WriteConfig::default()).unwrap();
    fs.write("dir/nested/file.txt", b"x", &WriteConfig::default())
        .unwrap();

    let listing = fs.list_contents("", true);
    assert_eq!(
        listing.iter().map(|e| e.path()).collect::<Vec<_>>(),
        vec!["dir", "dir/nested/file.txt", "dir/nested"]
    );
    assert!(fs.list_contents("missing", false).is_empty());

    assert!(fs.delete_dir("dir"));
    assert!(client.keys().is_empty());
}

#[test]
fn test_set_visibility_returns_record() {
    let (client, fs) = new_fs();
    fs.write("a.txt", b"x", &WriteConfig::default()).unwrap();
    assert_eq!(fs.get_visibility("a.txt"), Some(Visibility::Private));

    let record = fs.set_visibility("a.txt", Visibility::Public).unwrap();

    assert_eq!(record.visibility, Visibility::Public);
    assert_eq!(record.metadata.path, "a.txt");
    assert!(client
        .get_acl("prefix/a.txt", bucketfs::adapters::ALL_USERS)
        .is_ok());
}
