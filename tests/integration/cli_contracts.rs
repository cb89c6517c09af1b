use deskfs::api::FileSystemApi;
use deskfs::config::DeskfsConfig;
use deskfs::tooling::cli::{CliContext, Commands, TrashCommands};
use deskfs::tooling::format::OutputFormat;
use deskfs::trash::TrashSettings;

fn cli(user: &str) -> CliContext {
    let api = FileSystemApi::temporary(TrashSettings::default()).unwrap();
    let ctx = CliContext::from_parts(api, DeskfsConfig::default(), user).unwrap();
    ctx.execute(&Commands::Init).unwrap();
    ctx
}

fn json(ctx: &CliContext, command: Commands) -> serde_json::Value {
    serde_json::from_str(&ctx.execute(&command).unwrap()).unwrap()
}

#[test]
fn ls_json_contract_has_required_fields() {
    let ctx = cli("admin");
    let parsed = json(
        &ctx,
        Commands::Ls {
            path: None,
            format: OutputFormat::Json,
        },
    );
    let rows = parsed.as_array().unwrap();
    let names: Vec<&str> = rows.iter().filter_map(|r| r["name"].as_str()).collect();
    assert_eq!(names, vec!["Desktop", "Documents", "Downloads", "welcome.txt"]);
    for row in rows {
        assert!(row.get("node_id").and_then(|v| v.as_u64()).is_some());
        assert!(row.get("node_type").and_then(|v| v.as_str()).is_some());
        assert!(row.get("size").and_then(|v| v.as_u64()).is_some());
        assert!(row.get("permissions").and_then(|v| v.as_str()).is_some());
    }
}

#[test]
fn trash_list_json_contract_has_required_fields() {
    let ctx = cli("guest");
    ctx.execute(&Commands::Write {
        path: "Documents/draft.md".to_string(),
        content: "# draft".to_string(),
    })
    .unwrap();
    ctx.execute(&Commands::Rm {
        path: "Documents/draft.md".to_string(),
    })
    .unwrap();

    let parsed = json(
        &ctx,
        Commands::Trash {
            command: TrashCommands::List {
                limit: None,
                search: Some("DRAFT".to_string()),
                format: OutputFormat::Json,
            },
        },
    );
    let entry = &parsed.as_array().unwrap()[0];
    assert_eq!(entry["name"], "draft.md");
    assert_eq!(entry["original_path"], "/home/guest/Documents/draft.md");
    assert_eq!(entry["size"], 7);
    assert_eq!(entry["deleted_by"], "guest");
    assert!(entry.get("id").and_then(|v| v.as_u64()).is_some());
    assert!(entry.get("expires_at").and_then(|v| v.as_str()).is_some());
}

#[test]
fn trash_info_json_reports_count_and_size() {
    let ctx = cli("admin");
    ctx.execute(&Commands::Rm {
        path: "welcome.txt".to_string(),
    })
    .unwrap();

    let parsed = json(
        &ctx,
        Commands::Trash {
            command: TrashCommands::Info {
                format: OutputFormat::Json,
            },
        },
    );
    assert_eq!(parsed["user"], "admin");
    assert_eq!(parsed["items"], 1);
    assert_eq!(parsed["retention_days"], 30);
    assert!(parsed["total_size"].as_u64().unwrap() > 0);
}

#[test]
fn purge_and_empty_with_yes_skip_prompts() {
    let ctx = cli("admin");
    for name in ["a", "b", "c"] {
        ctx.execute(&Commands::Touch { path: name.to_string() }).unwrap();
        ctx.execute(&Commands::Rm { path: name.to_string() }).unwrap();
    }
    let first = ctx.api().list_trash("admin", None).unwrap()[0].id;

    let out = ctx
        .execute(&Commands::Trash {
            command: TrashCommands::Purge {
                ids: vec![first.0, first.0],
                yes: true,
            },
        })
        .unwrap();
    assert!(out.contains("Permanently deleted 1 item(s)."));

    let out = ctx
        .execute(&Commands::Trash {
            command: TrashCommands::Empty { yes: true },
        })
        .unwrap();
    assert!(out.contains("Emptied 2 item(s) from trash."));

    let out = ctx
        .execute(&Commands::Trash {
            command: TrashCommands::Empty { yes: true },
        })
        .unwrap();
    assert_eq!(out, "Trash is already empty.");
}

#[test]
fn restore_reports_renames() {
    let ctx = cli("admin");
    ctx.execute(&Commands::Touch { path: "doc.txt".to_string() }).unwrap();
    ctx.execute(&Commands::Rm { path: "doc.txt".to_string() }).unwrap();
    ctx.execute(&Commands::Touch { path: "doc.txt".to_string() }).unwrap();
    let id = ctx.api().list_trash("admin", None).unwrap()[0].id;

    let out = ctx
        .execute(&Commands::Trash {
            command: TrashCommands::Restore { ids: vec![id.0] },
        })
        .unwrap();
    assert!(out.contains("renamed or relocated"));
    assert!(out.contains("/home/admin/doc.txt (1)"));
}

#[test]
fn validate_and_sweep_json_contracts() {
    let ctx = cli("admin");
    let report = json(
        &ctx,
        Commands::Validate {
            format: OutputFormat::Json,
        },
    );
    assert_eq!(report["issues"].as_array().unwrap().len(), 0);
    assert!(report["nodes"].as_u64().unwrap() > 0);

    let sweep = json(
        &ctx,
        Commands::Sweep {
            daemon: false,
            format: OutputFormat::Json,
        },
    );
    assert_eq!(sweep["purged"], 0);
    assert_eq!(sweep["interrupted"], false);
}
