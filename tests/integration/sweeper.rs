use chrono::{Duration, Utc};
use deskfs::trash::{SweeperState, TrashSettings};
use std::sync::Arc;

use crate::integration::support::{assert_consistent, file, test_fs, test_fs_with};

#[test]
fn sweep_purges_only_expired_entries() {
    let fs = test_fs();
    let api = &fs.api;
    let old = file(api, "/home/admin", "old.log", b"o", "admin");
    let old_entry = api.delete_to_trash(old, "admin").unwrap();
    let expiry = api.trash_entry(old_entry, "admin").unwrap().expires_at;

    let report = api.sweeper().sweep_at(expiry - Duration::seconds(1));
    assert_eq!(report.purged, 0);
    assert_eq!(api.trash_count("admin").unwrap(), 1);

    std::thread::sleep(std::time::Duration::from_millis(5));
    let fresh = file(api, "/home/guest", "fresh.log", b"f", "guest");
    api.delete_to_trash(fresh, "guest").unwrap();

    let report = api.sweeper().sweep_at(expiry);
    assert_eq!(report.scanned, 1);
    assert_eq!(report.purged, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(api.trash_count("admin").unwrap(), 0);
    assert_eq!(api.trash_count("guest").unwrap(), 1);
    assert_eq!(api.sweeper().state(), SweeperState::Idle);
    assert_consistent(api);
}

#[test]
fn sweep_covers_every_user() {
    let fs = test_fs();
    let api = &fs.api;
    for user in ["admin", "guest"] {
        let id = file(api, &format!("/home/{}", user), "x", b"x", user);
        api.delete_to_trash(id, user).unwrap();
    }

    let report = api.sweeper().sweep_at(Utc::now() + Duration::days(31));
    assert_eq!(report.purged, 2);
    assert_eq!(api.sweeper().last_report(), Some(report));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn background_sweeper_catches_up_on_start() {
    let settings = TrashSettings {
        retention: Duration::zero(),
        ..TrashSettings::default()
    };
    let fs = test_fs_with(settings);
    let api = &fs.api;
    let id = file(api, "/home/admin", "gone.txt", b"g", "admin");
    api.delete_to_trash(id, "admin").unwrap();

    let handle = Arc::clone(api.sweeper()).start(std::time::Duration::from_secs(3600), true);
    let mut waited = 0;
    while api.sweeper().last_report().is_none() && waited < 100 {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        waited += 1;
    }
    handle.shutdown().await;

    assert_eq!(api.trash_count("admin").unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sweeps_after_shutdown_still_purge() {
    let settings = TrashSettings {
        retention: Duration::zero(),
        ..TrashSettings::default()
    };
    let fs = test_fs_with(settings);
    let api = &fs.api;

    Arc::clone(api.sweeper())
        .start(std::time::Duration::from_secs(3600), false)
        .shutdown()
        .await;

    let id = file(api, "/home/admin", "late.txt", b"l", "admin");
    api.delete_to_trash(id, "admin").unwrap();

    let report = api.sweep_expired();
    assert!(!report.interrupted);
    assert_eq!(report.purged, 1);
    assert_eq!(api.trash_count("admin").unwrap(), 0);
    assert_consistent(api);
}
