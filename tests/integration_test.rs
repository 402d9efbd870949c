use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use bitcleaner::config::groups::{CleanupGroup, CleanupTarget, GroupConfig, GroupSource, Platform};
use bitcleaner::core::analyzer::Analyzer;
use bitcleaner::core::cancel::CancelToken;
use bitcleaner::core::deleter;
use bitcleaner::core::fs::{expand_path, sorted_subdirectories};
use bitcleaner::core::group_scanner::GroupScanner;
use bitcleaner::core::prober::{
    parse_du_output, parse_powershell_output, walk_size, NativeProbe, SizeProber,
};
use bitcleaner::core::tree_builder::TreeBuilder;
use bitcleaner::error::DeleteError;
use bitcleaner::export::json::export_json;
use bitcleaner::models::node::{human_readable_size, Tree, TreeNode};
use bitcleaner::models::scan_result::{GroupResult, ItemKind, ScannedItem, SubFolderEntry};
use bitcleaner::platform::names::simulator_label;
use bitcleaner::stats::{StatsFile, StatsSink};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn write_bytes(path: &Path, len: usize) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, vec![b'x'; len]).unwrap();
}

fn portable() -> Arc<SizeProber> {
    Arc::new(SizeProber::portable())
}

fn no_progress(_: &Path, _: usize) {}

/// A tree over real directories with sizes chosen by the test.
fn tree_of(root: &Path, root_size: u64, children: &[(&str, u64)]) -> Tree {
    let mut tree = Tree::new(TreeNode::directory(root.to_path_buf(), root_size));
    for (name, size) in children {
        let path = root.join(name);
        std::fs::create_dir_all(&path).unwrap();
        tree.add_child(tree.root(), TreeNode::directory(path, *size));
    }
    tree
}

fn folders_item(name: &str, path: &Path, subs: &[(&str, u64)]) -> ScannedItem {
    let sub_items: Vec<SubFolderEntry> = subs
        .iter()
        .map(|(n, size)| SubFolderEntry {
            name: n.to_string(),
            path: path.join(n),
            size: *size,
        })
        .collect();
    ScannedItem {
        name: name.to_string(),
        path: path.to_string_lossy().to_string(),
        size: sub_items.iter().map(|s| s.size).sum(),
        kind: ItemKind::Folders,
        sub_items,
    }
}

// ---------------------------------------------------------------------------
// 1. Size probing
// ---------------------------------------------------------------------------

#[test]
fn test_walk_size_sums_file_lengths() {
    let dir = TempDir::new().unwrap();
    write_bytes(&dir.path().join("a.bin"), 100);
    write_bytes(&dir.path().join("sub/b.bin"), 2000);
    write_bytes(&dir.path().join("sub/deeper/c.bin"), 37);
    std::fs::create_dir_all(dir.path().join("empty")).unwrap();

    assert_eq!(walk_size(dir.path()), 2137);
    assert_eq!(SizeProber::portable().size(dir.path()), 2137);
    assert_eq!(walk_size(&dir.path().join("a.bin")), 100);
}

#[test]
fn test_size_of_missing_path_is_zero() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope");

    assert_eq!(walk_size(&missing), 0);
    assert_eq!(SizeProber::portable().size(&missing), 0);
    assert_eq!(SizeProber::for_host().size(&missing), 0);
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_never_followed() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("target");
    write_bytes(&target.join("big.bin"), 4096);

    let scanned = dir.path().join("scanned");
    write_bytes(&scanned.join("small.bin"), 10);
    std::os::unix::fs::symlink(&target, scanned.join("link")).unwrap();
    std::os::unix::fs::symlink(&target, dir.path().join("top-link")).unwrap();

    assert_eq!(walk_size(&scanned), 10);
    assert_eq!(walk_size(&dir.path().join("top-link")), 0);
    assert!(sorted_subdirectories(&scanned).is_empty());
}

#[cfg(unix)]
#[test]
fn test_host_prober_sizes_symlinks_as_zero() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("t".repeat(120));
    write_bytes(&target.join("big.bin"), 100 * 1024);

    let link = dir.path().join("link");
    std::os::unix::fs::symlink(&target, &link).unwrap();
    let dangling = dir.path().join("dangling");
    std::os::unix::fs::symlink(dir.path().join("d".repeat(200)), &dangling).unwrap();

    let host = SizeProber::for_host();
    assert_eq!(host.size(&link), 0);
    assert_eq!(host.size(&dangling), 0);
    assert_eq!(SizeProber::portable().size(&link), 0);
    assert_eq!(SizeProber::portable().size(&dangling), 0);
}

/// Native probe stand-in with a fixed answer.
struct FixedProbe(Option<u64>);

impl NativeProbe for FixedProbe {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn probe(&self, _path: &Path) -> Option<u64> {
        self.0
    }
}

#[test]
fn test_failed_native_probe_falls_back_to_walk() {
    let dir = TempDir::new().unwrap();
    write_bytes(&dir.path().join("a.bin"), 100);
    write_bytes(&dir.path().join("sub/b.bin"), 23);

    let prober = SizeProber::with_native(Box::new(FixedProbe(None)));
    assert_eq!(prober.size(dir.path()), 123);
}

#[test]
fn test_native_probe_answer_is_used() {
    let dir = TempDir::new().unwrap();
    write_bytes(&dir.path().join("a.bin"), 100);

    let prober = SizeProber::with_native(Box::new(FixedProbe(Some(4096))));
    assert_eq!(prober.size(dir.path()), 4096);

    // Missing paths never reach the probe.
    assert_eq!(prober.size(&dir.path().join("missing")), 0);
}

#[test]
fn test_parse_native_output() {
    assert_eq!(parse_du_output("12\t/tmp/x\n"), Some(12 * 1024));
    assert_eq!(parse_du_output("0 /tmp/empty"), Some(0));
    assert_eq!(parse_du_output(""), None);
    assert_eq!(parse_du_output("du: cannot access"), None);

    assert_eq!(parse_powershell_output("123456\r\n"), Some(123456));
    assert_eq!(parse_powershell_output(""), None);
    assert_eq!(parse_powershell_output("Access denied"), None);
}

#[test]
fn test_expand_path() {
    let home = dirs::home_dir().unwrap();
    assert_eq!(expand_path("~"), home);
    assert_eq!(expand_path("~/.cache"), home.join(".cache"));
    assert_eq!(expand_path("/var/tmp"), PathBuf::from("/var/tmp"));
    assert_eq!(expand_path("~someone/x"), PathBuf::from("~someone/x"));
}

// ---------------------------------------------------------------------------
// 2. Tree building
// ---------------------------------------------------------------------------

#[test]
fn test_tree_build_is_deterministic() {
    let dir = TempDir::new().unwrap();
    for name in ["beta", "Alpha", "gamma", "Delta"] {
        write_bytes(&dir.path().join(name).join("f.bin"), 64);
    }
    write_bytes(&dir.path().join("beta/inner/g.bin"), 16);
    write_bytes(&dir.path().join("loose.bin"), 5);

    let builder = TreeBuilder::new(portable());
    let first = builder.build(dir.path(), &CancelToken::new(), &no_progress).unwrap();
    let second = builder.build(dir.path(), &CancelToken::new(), &no_progress).unwrap();

    let names = |tree: &Tree| -> Vec<String> { tree.iter().map(|(_, n)| n.name.clone()).collect() };
    assert_eq!(names(&first), names(&second));

    let top: Vec<&str> = first.children(first.root()).map(|n| n.name.as_str()).collect();
    assert_eq!(top, vec!["Alpha", "beta", "Delta", "gamma"]);

    // Files are counted in sizes but are not nodes.
    assert_eq!(first.len(), 6);
    assert_eq!(first.root_node().size, 4 * 64 + 16 + 5);
    let beta = first.find_by_path(&dir.path().join("beta")).unwrap();
    assert_eq!(first.get(beta).unwrap().size, 80);
}

#[test]
fn test_tree_build_rejects_files() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("f.txt");
    write_bytes(&file, 3);

    let builder = TreeBuilder::new(portable());
    assert!(builder.build(&file, &CancelToken::new(), &no_progress).is_err());
    assert!(builder
        .build(&dir.path().join("missing"), &CancelToken::new(), &no_progress)
        .is_err());
}

#[test]
fn test_tree_build_stops_when_cancelled() {
    let dir = TempDir::new().unwrap();
    for name in ["a", "b", "c"] {
        std::fs::create_dir_all(dir.path().join(name)).unwrap();
    }

    let cancel = CancelToken::new();
    cancel.cancel();
    let tree = TreeBuilder::new(portable())
        .build(dir.path(), &cancel, &no_progress)
        .unwrap();
    assert_eq!(tree.len(), 1);
}

// ---------------------------------------------------------------------------
// 3. Tree deletion
// ---------------------------------------------------------------------------

#[test]
fn test_delete_propagates_to_ancestors_only() {
    let dir = TempDir::new().unwrap();
    let mut tree = tree_of(dir.path(), 1000, &[("A", 300), ("B", 700)]);
    let a = tree.find_by_path(&dir.path().join("A")).unwrap();
    let b = tree.find_by_path(&dir.path().join("B")).unwrap();

    let freed = deleter::delete_node(&mut tree, a).unwrap();

    assert_eq!(freed, 300);
    assert_eq!(tree.root_node().size, 700);
    assert_eq!(tree.get(b).unwrap().size, 700);
    let a_node = tree.get(a).unwrap();
    assert!(a_node.is_deleted);
    assert_eq!(a_node.size, 0);
    assert!(!dir.path().join("A").exists());
}

#[test]
fn test_delete_nested_leaf() {
    let dir = TempDir::new().unwrap();
    let mut tree = tree_of(dir.path(), 500, &[("outer", 400), ("other", 100)]);
    let outer = tree.find_by_path(&dir.path().join("outer")).unwrap();
    let leaf_path = dir.path().join("outer/leaf");
    std::fs::create_dir_all(&leaf_path).unwrap();
    let leaf = tree.add_child(outer, TreeNode::directory(leaf_path, 150));

    deleter::delete_node(&mut tree, leaf).unwrap();

    assert_eq!(tree.root_node().size, 350);
    assert_eq!(tree.get(outer).unwrap().size, 250);
    let other = tree.find_by_path(&dir.path().join("other")).unwrap();
    assert_eq!(tree.get(other).unwrap().size, 100);
}

#[test]
fn test_second_delete_fails_without_changes() {
    let dir = TempDir::new().unwrap();
    let mut tree = tree_of(dir.path(), 1000, &[("A", 300), ("B", 700)]);
    let a = tree.find_by_path(&dir.path().join("A")).unwrap();

    deleter::delete_node(&mut tree, a).unwrap();
    let sizes: Vec<u64> = tree.iter().map(|(_, n)| n.size).collect();

    let again = deleter::delete_node(&mut tree, a);
    assert!(matches!(again, Err(DeleteError::AlreadyDeleted(_))));
    assert_eq!(tree.iter().map(|(_, n)| n.size).collect::<Vec<_>>(), sizes);
}

#[test]
fn test_delete_missing_directory_leaves_tree_untouched() {
    let dir = TempDir::new().unwrap();
    let mut tree = tree_of(dir.path(), 1000, &[("A", 300)]);
    let a = tree.find_by_path(&dir.path().join("A")).unwrap();
    std::fs::remove_dir_all(dir.path().join("A")).unwrap();

    let result = deleter::delete_node(&mut tree, a);
    assert!(matches!(result, Err(DeleteError::NotFound(_))));
    assert_eq!(tree.root_node().size, 1000);
    assert!(!tree.get(a).unwrap().is_deleted);
}

#[test]
fn test_propagate_clamps_at_zero() {
    let dir = TempDir::new().unwrap();
    let mut tree = tree_of(dir.path(), 100, &[("A", 300)]);
    let a = tree.find_by_path(&dir.path().join("A")).unwrap();

    deleter::delete_node(&mut tree, a).unwrap();
    assert_eq!(tree.root_node().size, 0);
}

// ---------------------------------------------------------------------------
// 4. Analyzer
// ---------------------------------------------------------------------------

#[test]
fn test_top_buckets_merges_the_rest() {
    let mut tree = Tree::new(TreeNode::directory(PathBuf::from("/r"), 0));
    let sizes: Vec<u64> = (1..=15).map(|i| i * 10).collect();
    for (i, size) in sizes.iter().enumerate() {
        tree.add_child(tree.root(), TreeNode::directory(PathBuf::from(format!("/r/d{i}")), *size));
    }

    let buckets = Analyzer::top_buckets(&tree, tree.root());

    assert_eq!(buckets.len(), 11);
    assert_eq!(buckets[0].size, 150);
    assert_eq!(buckets.iter().map(|b| b.size).sum::<u64>(), sizes.iter().sum::<u64>());
    let others = buckets.last().unwrap();
    assert!(others.is_merged());
    assert_eq!(others.label, "Others");
    assert_eq!(others.merged_count, 5);
    assert_eq!(others.size, 10 + 20 + 30 + 40 + 50);
}

#[test]
fn test_sorted_children_skips_deleted_and_keeps_ties_stable() {
    let mut tree = Tree::new(TreeNode::directory(PathBuf::from("/r"), 0));
    let root = tree.root();
    let first = tree.add_child(root, TreeNode::directory(PathBuf::from("/r/a"), 5));
    let second = tree.add_child(root, TreeNode::directory(PathBuf::from("/r/b"), 5));
    let gone = tree.add_child(root, TreeNode::directory(PathBuf::from("/r/c"), 50));
    tree.get_mut(gone).unwrap().is_deleted = true;

    assert_eq!(Analyzer::sorted_children(&tree, root), vec![first, second]);
    assert_eq!(Analyzer::top_buckets(&tree, root).len(), 2);
}

#[test]
fn test_path_to_root_and_missing() {
    let mut tree = Tree::new(TreeNode::directory(PathBuf::from("/r"), 0));
    let a = tree.add_child(tree.root(), TreeNode::directory(PathBuf::from("/r/a"), 0));
    let b = tree.add_child(a, TreeNode::directory(PathBuf::from("/r/a/b"), 0));

    assert_eq!(tree.path_to(b), Some(vec![tree.root(), a, b]));
    assert_eq!(tree.path_to(tree.root()), Some(vec![tree.root()]));
    assert_eq!(tree.path_to(99), None);
    assert_eq!(tree.len(), 3);
}

// ---------------------------------------------------------------------------
// 5. Group scanning and deletion
// ---------------------------------------------------------------------------

#[test]
fn test_group_scan_measures_each_kind() {
    let dir = TempDir::new().unwrap();
    write_bytes(&dir.path().join("log.txt"), 12);
    write_bytes(&dir.path().join("build/out.bin"), 300);
    write_bytes(&dir.path().join("devices/zeta/x.bin"), 20);
    write_bytes(&dir.path().join("devices/Alpha/y.bin"), 30);

    let at = |p: &str| dir.path().join(p).to_string_lossy().to_string();
    let groups = vec![
        CleanupGroup {
            group_name: "Stuff".into(),
            group_image: String::new(),
            items: vec![
                CleanupTarget { name: "Log".into(), kind: ItemKind::File, path: at("log.txt") },
                CleanupTarget { name: "Build".into(), kind: ItemKind::Folder, path: at("build") },
                CleanupTarget { name: "Gone".into(), kind: ItemKind::Folder, path: at("gone") },
                CleanupTarget { name: "Devices".into(), kind: ItemKind::Folders, path: at("devices") },
            ],
        },
        CleanupGroup {
            group_name: "Empty".into(),
            group_image: String::new(),
            items: vec![CleanupTarget { name: "None".into(), kind: ItemKind::Folder, path: at("none") }],
        },
    ];

    let results = GroupScanner::new(portable())
        .scan(&groups, &CancelToken::new(), &no_progress)
        .unwrap();

    assert_eq!(results.len(), 1);
    let items = &results[0].items;
    let sizes: Vec<(&str, u64)> = items.iter().map(|i| (i.name.as_str(), i.size)).collect();
    assert_eq!(sizes, vec![("Log", 12), ("Build", 300), ("Devices", 50)]);

    let subs: Vec<&str> = items[2].sub_items.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(subs, vec!["Alpha", "zeta"]);
    assert_eq!(results[0].total_size(), 362);
}

#[test]
fn test_group_scan_cancelled_returns_none() {
    let groups = vec![CleanupGroup {
        group_name: "G".into(),
        group_image: String::new(),
        items: vec![CleanupTarget { name: "x".into(), kind: ItemKind::Folder, path: "/".into() }],
    }];
    let cancel = CancelToken::new();
    cancel.cancel();
    assert!(GroupScanner::new(portable()).scan(&groups, &cancel, &no_progress).is_none());
}

#[test]
fn test_delete_last_sub_entry_drops_item_and_group() {
    let dir = TempDir::new().unwrap();
    let devices = dir.path().join("devices");
    write_bytes(&devices.join("only/data.bin"), 64);

    let groups = vec![GroupResult {
        group_name: "Simulators".into(),
        group_image: String::new(),
        items: vec![folders_item("Devices", &devices, &[("only", 64)])],
    }];

    let (remaining, freed) = deleter::delete_item(&groups, &devices.join("only")).unwrap();
    assert_eq!(freed, 64);
    assert!(remaining.is_empty());
    assert!(!devices.join("only").exists());
    assert!(devices.exists());
}

#[test]
fn test_delete_sub_entry_resums_item() {
    let dir = TempDir::new().unwrap();
    let devices = dir.path().join("devices");
    write_bytes(&devices.join("a/data.bin"), 10);
    write_bytes(&devices.join("b/data.bin"), 20);

    let groups = vec![GroupResult {
        group_name: "Simulators".into(),
        group_image: String::new(),
        items: vec![folders_item("Devices", &devices, &[("a", 10), ("b", 20)])],
    }];

    let (remaining, freed) = deleter::delete_item(&groups, &devices.join("a")).unwrap();
    assert_eq!(freed, 10);
    assert_eq!(remaining[0].items[0].size, 20);
    assert_eq!(remaining[0].items[0].sub_items.len(), 1);
}

#[test]
fn test_delete_untracked_or_missing_item_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let build = dir.path().join("build");
    let groups = vec![GroupResult {
        group_name: "Caches".into(),
        group_image: String::new(),
        items: vec![ScannedItem {
            name: "build".into(),
            path: build.to_string_lossy().to_string(),
            size: 99,
            kind: ItemKind::Folder,
            sub_items: vec![],
        }],
    }];

    let untracked = deleter::delete_item(&groups, &dir.path().join("other"));
    assert!(matches!(untracked, Err(DeleteError::NotTracked(_))));

    // Listed but already gone from disk.
    let missing = deleter::delete_item(&groups, &build);
    assert!(matches!(missing, Err(DeleteError::NotFound(_))));
}

#[test]
fn test_delete_group_frees_and_drops_group() {
    let dir = TempDir::new().unwrap();
    let build = dir.path().join("build");
    write_bytes(&build.join("out.bin"), 2048);
    let groups = vec![
        GroupResult {
            group_name: "Caches".into(),
            group_image: String::new(),
            items: vec![ScannedItem {
                name: "build".into(),
                path: build.to_string_lossy().to_string(),
                size: 2048,
                kind: ItemKind::Folder,
                sub_items: vec![],
            }],
        },
        GroupResult {
            group_name: "Logs".into(),
            group_image: String::new(),
            items: vec![],
        },
    ];

    let (remaining, freed) = deleter::delete_group(&groups, "Caches");
    assert_eq!(freed, 2048);
    assert!(!build.exists());
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].group_name, "Logs");

    let (unchanged, none) = deleter::delete_group(&remaining, "Nope");
    assert_eq!(none, 0);
    assert_eq!(unchanged, remaining);
}

// ---------------------------------------------------------------------------
// 6. Config, names, stats, export
// ---------------------------------------------------------------------------

#[test]
fn test_group_config_parsing() {
    let json = r#"{
        "linuxList": [
            { "groupName": "Caches", "groupImage": "cache",
              "items": [ { "name": "Cargo", "type": "folder", "path": "~/.cargo/registry" },
                         { "name": "Apps", "type": "folders", "path": "~/.cache" } ] }
        ]
    }"#;
    let config = GroupConfig::from_json(json).unwrap();

    let linux = config.load(Platform::Linux).unwrap();
    assert_eq!(linux.len(), 1);
    assert_eq!(linux[0].items[1].kind, ItemKind::Folders);
    assert!(config.load(Platform::Windows).unwrap().is_empty());

    assert!(GroupConfig::from_json("{ not json").is_err());
    assert!(GroupConfig::builtin().is_ok());
    assert_eq!("macOS".parse::<Platform>().unwrap(), Platform::Macos);
}

#[test]
fn test_simulator_label() {
    let plist = r#"<plist><dict>
        <key>name</key><string>iPhone 15 Pro</string>
        <key>runtime</key><string>com.apple.CoreSimulator.SimRuntime.iOS-17-0</string>
    </dict></plist>"#;
    assert_eq!(simulator_label(plist).as_deref(), Some("iPhone 15 Pro (iOS 17.0)"));

    let vision = plist.replace("iOS-17-0", "xrOS-1-2");
    assert_eq!(simulator_label(&vision).as_deref(), Some("iPhone 15 Pro (visionOS 1.2)"));

    let odd = plist.replace("iOS-17-0", "weird");
    assert_eq!(simulator_label(&odd).as_deref(), Some("iPhone 15 Pro"));
    assert_eq!(simulator_label("<plist/>"), None);
}

#[test]
fn test_stats_file_persists() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested/stats.json");

    let stats = StatsFile::open(&path);
    stats.add_cleaned_space(1000);
    stats.add_cleaned_space(24);

    let reopened = StatsFile::open(&path);
    let record = reopened.record();
    assert_eq!(record.total_cleaned, 1024);
    assert_eq!(record.items_deleted, 2);
    assert!(record.last_cleaned.is_some());

    reopened.reset_stats();
    assert_eq!(StatsFile::open(&path).record().total_cleaned, 0);
}

#[test]
fn test_export_json() {
    let dir = TempDir::new().unwrap();
    let mut tree = tree_of(dir.path(), 1000, &[("A", 300), ("B", 700)]);
    let a = tree.find_by_path(&dir.path().join("A")).unwrap();
    deleter::delete_node(&mut tree, a).unwrap();

    let out = dir.path().join("report.json");
    export_json(&tree, &out).unwrap();

    let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(value["total_size"], 700);
    assert_eq!(value["root"]["children"][0]["deleted"], true);
    assert_eq!(value["root"]["children"][1]["size"], 700);
}

#[test]
fn test_human_readable_size() {
    assert_eq!(human_readable_size(0), "0 B");
    assert_eq!(human_readable_size(1023), "1023 B");
    assert_eq!(human_readable_size(1024), "1.00 KB");
    assert_eq!(human_readable_size(1536), "1.50 KB");
    assert_eq!(human_readable_size(1024 * 1024), "1.00 MB");
    assert_eq!(human_readable_size(1024 * 1024 * 1024), "1.00 GB");

    let node = TreeNode::directory(PathBuf::from("/f"), 2048);
    assert_eq!(node.human_readable_size(), "2.00 KB");
    assert!((node.percentage(4096) - 50.0).abs() < f64::EPSILON);
    assert_eq!(node.percentage(0), 0.0);
}
