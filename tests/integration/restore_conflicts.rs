use deskfs::api::FileSystemApi;
use deskfs::error::FsError;
use deskfs::trash::TrashSettings;

use crate::integration::support::{assert_consistent, dir, file, names, test_fs, test_fs_with};

#[test]
fn restore_into_taken_slot_gets_numbered_name() {
    let fs = test_fs();
    let api = &fs.api;
    let id = file(api, "/home/admin/Documents", "doc.txt", b"old", "admin");
    let entry = api.delete_to_trash(id, "admin").unwrap();
    file(api, "/home/admin/Documents", "doc.txt", b"new", "admin");

    let outcome = api.restore_from_trash(entry, "admin").unwrap();
    assert!(outcome.renamed);
    assert_eq!(outcome.original_name, "doc.txt");
    assert_eq!(outcome.final_name, "doc.txt (1)");
    assert_eq!(api.read_file("/home/admin/Documents/doc.txt").unwrap(), b"new");
    assert_eq!(api.read_file("/home/admin/Documents/doc.txt (1)").unwrap(), b"old");
    assert_consistent(api);
}

#[test]
fn repeated_collisions_keep_counting() {
    let fs = test_fs();
    let api = &fs.api;
    let mut entries = Vec::new();
    for _ in 0..3 {
        let id = file(api, "/home/admin", "notes", b"n", "admin");
        entries.push(api.delete_to_trash(id, "admin").unwrap());
    }
    file(api, "/home/admin", "notes", b"live", "admin");

    let finals: Vec<String> = entries
        .into_iter()
        .map(|e| api.restore_from_trash(e, "admin").unwrap().final_name)
        .collect();
    assert_eq!(finals, vec!["notes (1)", "notes (2)", "notes (3)"]);
}

#[test]
fn restore_gives_up_after_max_attempts() {
    let settings = TrashSettings {
        max_restore_attempts: 2,
        ..TrashSettings::default()
    };
    let fs = test_fs_with(settings);
    let api = &fs.api;
    let id = file(api, "/home/admin", "x", b"", "admin");
    let entry = api.delete_to_trash(id, "admin").unwrap();
    // Two attempts cover "x" and "x (1)" only.
    for name in ["x", "x (1)"] {
        file(api, "/home/admin", name, b"", "admin");
    }

    assert!(matches!(
        api.restore_from_trash(entry, "admin"),
        Err(FsError::RestoreConflict { .. })
    ));
    // A failed restore leaves the entry in place.
    assert!(api.trash_entry(entry, "admin").is_ok());
    assert!(!api.exists("/home/admin", "x (2)").unwrap());
    assert_consistent(api);
}

#[test]
fn restore_relocates_to_home_when_parent_is_gone() {
    let fs = test_fs();
    let api = &fs.api;
    let folder = dir(api, "/home/admin", "Old", "admin");
    let inner = file(api, "/home/admin/Old", "keep.txt", b"k", "admin");

    let file_entry = api.delete_to_trash(inner, "admin").unwrap();
    let folder_entry = api.delete_to_trash(folder, "admin").unwrap();
    api.purge(folder_entry, "admin").unwrap();

    let outcome = api.restore_from_trash(file_entry, "admin").unwrap();
    assert!(outcome.relocated);
    assert_eq!(outcome.final_path, "/home/admin/keep.txt");
    assert_consistent(api);
}

#[test]
fn restore_falls_back_to_root_without_home() {
    let settings = TrashSettings {
        home_root: "/users".to_string(),
        ..TrashSettings::default()
    };
    let api = FileSystemApi::temporary(settings).unwrap();
    let tmp = dir(&api, "/", "tmp", "ghost");
    let id = file(&api, "/tmp", "orphan", b"o", "ghost");
    let entry = api.delete_to_trash(id, "ghost").unwrap();
    api.delete_to_trash(tmp, "ghost").unwrap();

    let outcome = api.restore_from_trash(entry, "ghost").unwrap();
    assert!(outcome.relocated);
    assert_eq!(outcome.final_path, "/orphan");
}

#[test]
fn restored_directory_is_renamed_but_children_keep_names() {
    let fs = test_fs();
    let api = &fs.api;
    let photos = dir(api, "/home/admin", "Photos", "admin");
    file(api, "/home/admin/Photos", "cat.png", b"meow", "admin");
    let entry = api.delete_to_trash(photos, "admin").unwrap();
    dir(api, "/home/admin", "Photos", "admin");

    let outcome = api.restore_from_trash(entry, "admin").unwrap();
    assert_eq!(outcome.final_path, "/home/admin/Photos (1)");
    assert_eq!(names(api, "/home/admin/Photos (1)"), vec!["cat.png"]);
    assert!(names(api, "/home/admin/Photos").is_empty());
    assert_consistent(api);
}

#[test]
fn concurrent_restores_of_one_entry_succeed_once() {
    let fs = test_fs();
    let api = &fs.api;
    let id = file(api, "/home/admin", "race.txt", b"r", "admin");
    let entry = api.delete_to_trash(id, "admin").unwrap();

    let results: Vec<Result<_, FsError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| api.restore_from_trash(entry, "admin")))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, FsError::NotFound(_))));
    assert_eq!(names(api, "/home/admin").iter().filter(|n| n.starts_with("race")).count(), 1);
    assert_consistent(api);
}
