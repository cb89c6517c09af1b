use deskfs::error::FsError;
use deskfs::store::NodeKind;

use crate::integration::support::{assert_consistent, dir, file, names, test_fs};

#[test]
fn delete_then_restore_round_trips_a_file() {
    let fs = test_fs();
    let api = &fs.api;
    let id = file(api, "/home/admin/Documents", "report.txt", b"quarterly", "admin");
    let before = api.get_node(id).unwrap();

    let entry_id = api.delete_to_trash(id, "admin").unwrap();
    assert!(!api.exists("/home/admin/Documents", "report.txt").unwrap());
    assert!(matches!(api.get_node(id), Err(FsError::NotFound(_))));

    let entry = api.trash_entry(entry_id, "admin").unwrap();
    assert_eq!(entry.original_path(), "/home/admin/Documents/report.txt");
    assert_eq!(entry.deleted_by, "admin");
    assert!(entry.expires_at > entry.deleted_at);

    let outcome = api.restore_from_trash(entry_id, "admin").unwrap();
    assert!(!outcome.renamed);
    assert!(!outcome.relocated);
    assert_eq!(outcome.final_path, "/home/admin/Documents/report.txt");

    let after = api.stat("/home/admin/Documents/report.txt").unwrap();
    assert_eq!(after.kind, before.kind);
    assert_eq!(after.owner, before.owner);
    assert_eq!(after.permissions, before.permissions);
    assert_eq!(after.created_at, before.created_at);
    assert_eq!(api.trash_count("admin").unwrap(), 0);
    assert_consistent(api);
}

#[test]
fn deleting_a_directory_trashes_every_descendant() {
    let fs = test_fs();
    let api = &fs.api;
    let projects = dir(api, "/home/admin", "Projects", "admin");
    file(api, "/home/admin/Projects", "a.txt", b"aa", "admin");
    file(api, "/home/admin/Projects", "b.txt", b"bbb", "admin");

    let root = api.delete_to_trash(projects, "admin").unwrap();
    assert!(!api.exists("/home/admin", "Projects").unwrap());
    assert!(matches!(
        api.list_directory("/home/admin/Projects"),
        Err(FsError::NotFound(_)) | Err(FsError::InvalidParent(_))
    ));

    let entries = api.list_trash("admin", None).unwrap();
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|e| e.batch_id == root));
    let root_entry = entries.iter().find(|e| e.id == root).unwrap();
    assert!(matches!(root_entry.kind, NodeKind::Directory));
    assert_eq!(root_entry.children.len(), 2);
    assert_eq!(api.trash_size("admin").unwrap(), 5);
    assert_consistent(api);
}

#[test]
fn restoring_a_directory_brings_back_its_subtree() {
    let fs = test_fs();
    let api = &fs.api;
    let projects = dir(api, "/home/admin", "Projects", "admin");
    dir(api, "/home/admin/Projects", "src", "admin");
    file(api, "/home/admin/Projects/src", "main.rs", b"fn main() {}", "admin");
    file(api, "/home/admin/Projects", "README", b"hi", "admin");

    let root = api.delete_to_trash(projects, "admin").unwrap();
    let outcome = api.restore_from_trash(root, "admin").unwrap();
    assert_eq!(outcome.restored_entries, 4);

    assert_eq!(names(api, "/home/admin/Projects"), vec!["src", "README"]);
    assert_eq!(
        api.read_file("/home/admin/Projects/src/main.rs").unwrap(),
        b"fn main() {}"
    );
    assert_eq!(api.trash_count("admin").unwrap(), 0);
    assert_consistent(api);
}

#[test]
fn trash_is_scoped_per_user() {
    let fs = test_fs();
    let api = &fs.api;
    let a = file(api, "/home/admin", "a.bin", &[0; 100], "admin");
    let g = file(api, "/home/guest", "g.bin", &[0; 40], "guest");
    let shared = file(api, "/home/guest", "shared.bin", &[0; 7], "guest");

    let admin_entry = api.delete_to_trash(a, "admin").unwrap();
    api.delete_to_trash(g, "guest").unwrap();
    // The acting user owns the trash entry, not the node's owner.
    api.delete_to_trash(shared, "admin").unwrap();

    assert_eq!(api.trash_size("admin").unwrap(), 107);
    assert_eq!(api.trash_size("guest").unwrap(), 40);
    assert_eq!(api.trash_count("admin").unwrap(), 2);
    assert_eq!(api.trash_count("guest").unwrap(), 1);
    assert_eq!(api.trash_size("nobody").unwrap(), 0);

    assert!(matches!(
        api.restore_from_trash(admin_entry, "guest"),
        Err(FsError::NotFound(_))
    ));
    assert!(api.list_trash("guest", None).unwrap().iter().all(|e| e.user == "guest"));
}

#[test]
fn purge_is_permanent_and_idempotent() {
    let fs = test_fs();
    let api = &fs.api;
    let id = file(api, "/home/admin", "tmp.txt", b"x", "admin");
    let entry = api.delete_to_trash(id, "admin").unwrap();

    assert!(api.purge(entry, "admin").unwrap());
    assert!(!api.purge(entry, "admin").unwrap());
    assert!(matches!(
        api.restore_from_trash(entry, "admin"),
        Err(FsError::NotFound(_))
    ));
    assert!(!api.exists("/home/admin", "tmp.txt").unwrap());
    assert_consistent(api);
}

#[test]
fn empty_trash_removes_only_that_users_entries() {
    let fs = test_fs();
    let api = &fs.api;
    for name in ["1", "2", "3"] {
        let id = file(api, "/home/admin", name, b"x", "admin");
        api.delete_to_trash(id, "admin").unwrap();
    }
    let g = file(api, "/home/guest", "keep", b"x", "guest");
    api.delete_to_trash(g, "guest").unwrap();

    assert_eq!(api.empty_trash("admin").unwrap(), 3);
    assert_eq!(api.empty_trash("admin").unwrap(), 0);
    assert_eq!(api.trash_count("guest").unwrap(), 1);
    assert_consistent(api);
}

#[test]
fn trash_lists_most_recent_first() {
    let fs = test_fs();
    let api = &fs.api;
    let mut expected = Vec::new();
    for name in ["first", "second", "third"] {
        let id = file(api, "/home/admin", name, b"x", "admin");
        expected.push(api.delete_to_trash(id, "admin").unwrap());
    }
    expected.reverse();

    let listed: Vec<_> = api.list_trash("admin", None).unwrap().iter().map(|e| e.id).collect();
    assert_eq!(listed, expected);
    assert_eq!(api.list_trash("admin", Some(2)).unwrap().len(), 2);
}
