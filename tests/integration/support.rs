use deskfs::api::FileSystemApi;
use deskfs::store::NodeType;
use deskfs::trash::TrashSettings;
use deskfs::types::NodeId;
use std::sync::Arc;
use tempfile::TempDir;

pub const USERS: [&str; 2] = ["admin", "guest"];

/// Api over an on-disk store with admin and guest homes in place
pub struct TestFs {
    pub api: FileSystemApi,
    _dir: TempDir,
}

pub fn test_fs() -> TestFs {
    test_fs_with(TrashSettings::default())
}

pub fn test_fs_with(settings: TrashSettings) -> TestFs {
    let dir = TempDir::new().unwrap();
    let store = deskfs::store::persistence::SledFsStore::new(&dir.path().join("store")).unwrap();
    let api = FileSystemApi::new(Arc::new(store), settings);
    let users: Vec<String> = USERS.iter().map(|u| u.to_string()).collect();
    api.bootstrap(&users).unwrap();
    TestFs { api, _dir: dir }
}

pub fn file(api: &FileSystemApi, parent: &str, name: &str, content: &[u8], owner: &str) -> NodeId {
    api.create_node(parent, name, NodeType::File, Some(content.to_vec()), owner)
        .unwrap()
}

pub fn dir(api: &FileSystemApi, parent: &str, name: &str, owner: &str) -> NodeId {
    api.create_node(parent, name, NodeType::Directory, None, owner).unwrap()
}

pub fn names(api: &FileSystemApi, dir: &str) -> Vec<String> {
    api.list_directory(dir)
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect()
}

pub fn assert_consistent(api: &FileSystemApi) {
    let report = api.validate().unwrap();
    assert!(report.is_consistent(), "integrity issues: {:?}", report.issues);
}
