use deskfs::api::FileSystemApi;
use deskfs::error::FsError;
use deskfs::store::NodeType;
use deskfs::trash::TrashSettings;
use proptest::prelude::*;
use std::collections::HashSet;

#[derive(Debug, Clone)]
enum Op {
    Create { name: usize, dir: bool },
    Delete(usize),
    RestoreLatest,
    Rename { from: usize, to: usize },
}

const NAMES: [&str; 4] = ["a", "b", "c.txt", "d"];

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..NAMES.len(), any::<bool>()).prop_map(|(name, dir)| Op::Create { name, dir }),
        (0..NAMES.len()).prop_map(Op::Delete),
        Just(Op::RestoreLatest),
        (0..NAMES.len(), 0..NAMES.len()).prop_map(|(from, to)| Op::Rename { from, to }),
    ]
}

fn apply(api: &FileSystemApi, op: &Op) {
    let result = match op {
        Op::Create { name, dir } => {
            let kind = if *dir { NodeType::Directory } else { NodeType::File };
            api.create_node("/w", NAMES[*name], kind, None, "admin").map(|_| ())
        }
        Op::Delete(name) => api
            .resolve("/w", NAMES[*name])
            .and_then(|id| api.delete_to_trash(id, "admin"))
            .map(|_| ()),
        Op::RestoreLatest => match api.list_trash("admin", Some(1)).unwrap().first() {
            Some(entry) => api.restore_from_trash(entry.id, "admin").map(|_| ()),
            None => Ok(()),
        },
        Op::Rename { from, to } => api
            .resolve("/w", NAMES[*from])
            .and_then(|id| api.rename(id, NAMES[*to])),
    };
    match result {
        Ok(()) | Err(FsError::NotFound(_)) | Err(FsError::AlreadyExists(_)) => {}
        Err(e) => panic!("unexpected error for {:?}: {}", op, e),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn names_stay_unique_and_store_stays_consistent(ops in prop::collection::vec(op(), 1..30)) {
        let api = FileSystemApi::temporary(TrashSettings::default()).unwrap();
        api.create_node("/", "w", NodeType::Directory, None, "admin").unwrap();

        for op in &ops {
            apply(&api, op);

            let listing = api.list_directory("/w").unwrap();
            let unique: HashSet<&str> = listing.iter().map(|e| e.name.as_str()).collect();
            prop_assert_eq!(unique.len(), listing.len());

            let report = api.validate().unwrap();
            prop_assert!(report.is_consistent(), "after {:?}: {:?}", op, report.issues);
        }
    }

    #[test]
    fn trash_size_matches_deleted_content(sizes in prop::collection::vec(0usize..512, 1..8)) {
        let api = FileSystemApi::temporary(TrashSettings::default()).unwrap();
        for (i, size) in sizes.iter().enumerate() {
            let id = api
                .create_node("/", &format!("f{}", i), NodeType::File, Some(vec![7; *size]), "admin")
                .unwrap();
            api.delete_to_trash(id, "admin").unwrap();
        }
        let total: usize = sizes.iter().sum();
        prop_assert_eq!(api.trash_size("admin").unwrap(), total as u64);
        prop_assert_eq!(api.trash_count("admin").unwrap(), sizes.len());
    }
}
