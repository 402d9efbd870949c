use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;

use crate::config::groups::{ConfigFile, GroupConfig, GroupSource};
use crate::config::settings::Settings;
use crate::core::events::{self, Event, EventReceiver};
use crate::core::fs::expand_path;
use crate::core::prober::SizeProber;
use crate::models::node::{human_readable_size, Tree};
use crate::models::scan_result::{total_size, GroupResult, ItemKind};
use crate::platform::{names, opener};
use crate::session::{CustomSession, SimpleScanState, SimpleSession};
use crate::stats::{StatsFile, StatsSink};

pub struct TreeOptions {
    pub path: String,
    pub delete: Vec<PathBuf>,
    pub confirm: bool,
    pub export_json: Option<PathBuf>,
}

pub struct SimpleOptions {
    pub delete_groups: Vec<String>,
    pub delete_items: Vec<PathBuf>,
    pub confirm: bool,
}

pub struct App {
    settings: Settings,
    prober: Arc<SizeProber>,
    stats: Arc<StatsFile>,
}

impl App {
    pub fn new(settings: Settings) -> Self {
        let prober = Arc::new(SizeProber::from_settings(&settings));
        let stats = Arc::new(StatsFile::open(settings.stats_file.clone()));
        Self {
            settings,
            prober,
            stats,
        }
    }

    pub async fn run_tree(&self, opts: TreeOptions) -> anyhow::Result<()> {
        let (event_tx, event_rx) = events::create_event_channel();
        let stats: Arc<dyn StatsSink> = self.stats.clone();
        let session = CustomSession::new(Arc::clone(&self.prober), stats).with_events(event_tx);

        session.start_scan(&opts.path)?;
        let state = session.subscribe();
        wait_until(state, event_rx, |s| !s.is_scanning(), || session.cancel_scan()).await?;

        if session.with_tree(print_tree).is_none() {
            println!("Scan cancelled.");
            return Ok(());
        }

        for target in &opts.delete {
            let target = std::path::absolute(expand_path(&target.to_string_lossy()))?;
            let Some(id) = session.with_tree(|tree| tree.find_by_path(&target)).flatten() else {
                println!("Not in tree: {}", target.display());
                continue;
            };
            if !opts.confirm {
                println!("Would delete: {}", target.display());
                continue;
            }
            match session.delete_node(id).await {
                Ok(freed) => println!("Deleted {} ({})", target.display(), human_readable_size(freed)),
                Err(e) => println!("Failed to delete {}: {}", target.display(), e),
            }
        }
        if opts.confirm && !opts.delete.is_empty() {
            session.with_tree(print_tree);
        }

        if let Some(export_path) = &opts.export_json {
            if let Some(result) = session.with_tree(|tree| crate::export::json::export_json(tree, export_path)) {
                result?;
                println!("Exported to: {}", export_path.display());
            }
        }
        Ok(())
    }

    pub async fn run_simple(&self, opts: SimpleOptions) -> anyhow::Result<()> {
        let source: Arc<dyn GroupSource> = match &self.settings.groups_file {
            Some(path) => Arc::new(ConfigFile::new(path)),
            None => Arc::new(GroupConfig::builtin()?),
        };
        let (event_tx, event_rx) = events::create_event_channel();
        let stats: Arc<dyn StatsSink> = self.stats.clone();
        let session = SimpleSession::new(
            Arc::clone(&self.prober),
            source,
            self.settings.platform(),
            stats,
        )
        .with_events(event_tx);

        session.start_scan()?;
        let state = session.subscribe();
        wait_until(state, event_rx, |s| !s.is_scanning(), || session.cancel_scan()).await?;

        match session.state() {
            SimpleScanState::Completed(groups) => print_groups(&groups),
            SimpleScanState::Error(message) => anyhow::bail!("scan failed: {message}"),
            _ => {
                println!("Scan cancelled.");
                return Ok(());
            }
        }

        let mut changed = false;
        for group in &opts.delete_groups {
            if !opts.confirm {
                println!("Would delete group: {group}");
                continue;
            }
            match session.delete_group(group).await {
                Ok(freed) => println!("Deleted group {group} ({})", human_readable_size(freed)),
                Err(e) => println!("Failed to delete group {group}: {e}"),
            }
            changed = true;
        }
        for item in &opts.delete_items {
            if !opts.confirm {
                println!("Would delete: {}", item.display());
                continue;
            }
            match session.delete_item(item).await {
                Ok(freed) => println!("Deleted {} ({})", item.display(), human_readable_size(freed)),
                Err(e) => println!("Failed to delete {}: {}", item.display(), e),
            }
            changed = true;
        }

        if changed {
            if let SimpleScanState::Completed(groups) = session.state() {
                print_groups(&groups);
            }
        }
        Ok(())
    }

    pub fn show_stats(&self, reset: bool) -> anyhow::Result<()> {
        if reset {
            self.stats.reset_stats();
            println!("Statistics reset.");
            return Ok(());
        }
        let record = self.stats.record();
        println!("Total cleaned: {}", human_readable_size(record.total_cleaned));
        println!("Items deleted: {}", record.items_deleted);
        if let Some(last) = record.last_cleaned {
            println!("Last cleaned:  {}", last.format("%Y-%m-%d %H:%M:%S"));
        }
        Ok(())
    }

    pub fn open(&self, path: &str) -> anyhow::Result<()> {
        let path = expand_path(path);
        opener::for_host().open(&path)?;
        Ok(())
    }
}

/// Log scan events until the state satisfies `done`. Ctrl-C calls `cancel`.
async fn wait_until<S>(
    mut state: watch::Receiver<S>,
    mut event_rx: EventReceiver,
    done: impl Fn(&S) -> bool,
    cancel: impl Fn(),
) -> anyhow::Result<()> {
    loop {
        tokio::select! {
            Some(event) = event_rx.recv() => log_event(&event),
            result = state.wait_for(|s| done(s)) => {
                result?;
                return Ok(());
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, cancelling scan");
                cancel();
            }
        }
    }
}

fn log_event(event: &Event) {
    match event {
        Event::Progress {
            scanned,
            current_path,
        } => tracing::info!("[{}] {}", scanned, current_path.display()),
        Event::ScanStarted { path } => tracing::info!("scanning {}", path.display()),
        Event::ScanCompleted {
            total_size,
            duration_ms,
        } => tracing::info!(
            "scan finished: {} in {} ms",
            human_readable_size(*total_size),
            duration_ms
        ),
        Event::ScanCancelled => tracing::info!("scan cancelled"),
        Event::ScanFailed { error } => tracing::error!("scan failed: {}", error),
        Event::Deleted { .. }
        | Event::DeleteFailed { .. }
        | Event::GroupDeleted { .. }
        | Event::GroupDeleteFailed { .. } => {}
    }
}

fn print_tree(tree: &Tree) {
    let root = tree.root_node();
    println!("{}  {}", root.path.display(), root.human_readable_size());
    for bucket in crate::core::analyzer::Analyzer::top_buckets(tree, tree.root()) {
        let pct = if root.size == 0 {
            0.0
        } else {
            bucket.size as f64 / root.size as f64 * 100.0
        };
        let label = if bucket.is_merged() {
            format!("{} ({} more)", bucket.label, bucket.merged_count)
        } else {
            bucket.label.clone()
        };
        println!("  {:>10}  {:>5.1}%  {}", human_readable_size(bucket.size), pct, label);
    }
}

fn print_groups(groups: &[GroupResult]) {
    if groups.is_empty() {
        println!("Nothing to clean.");
        return;
    }
    let names = names::for_host();
    for group in groups {
        println!("{}  {}", group.group_name, human_readable_size(group.total_size()));
        for item in &group.items {
            println!("  {:>10}  {}  [{}]", human_readable_size(item.size), item.name, item.path);
            if item.kind == ItemKind::Folders {
                for sub in &item.sub_items {
                    let label = names.resolve(&sub.path, &sub.name);
                    println!("    {:>10}  {}", human_readable_size(sub.size), label);
                }
            }
        }
    }
    println!("Total: {}", human_readable_size(total_size(groups)));
}
