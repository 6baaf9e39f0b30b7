// Item manager: to-do and done lists with a JSONL snapshot

use crate::item::ToDoItem;
use crate::jsonl;
use crate::lifecycle::LifecycleEvent;
use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const CURRENT_VERSION: u32 = 1;
const STORE_DIR: &str = ".todostore";
const SNAPSHOT_FILE: &str = "items.jsonl";

/// List an item belongs to in the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum List {
    Todo,
    Done,
}

/// Snapshot line as written: the item's fields plus its list
#[derive(Serialize)]
struct SnapshotLine<'a> {
    list: List,
    #[serde(flatten)]
    item: &'a ToDoItem,
}

/// Snapshot line as read back
#[derive(Deserialize)]
struct SnapshotEntry {
    list: List,
    #[serde(flatten)]
    item: ToDoItem,
}

/// Ordered to-do and done items, restored from and saved to a snapshot
///
/// Both lists live in one JSONL file, so a save replaces them together.
/// Index-taking methods panic when the index is out of range; callers check
/// `to_do_count()` / `done_count()` first.
#[derive(Debug)]
pub struct ItemManager {
    base_path: PathBuf,
    to_do: Vec<ToDoItem>,
    done: Vec<ToDoItem>,
}

impl ItemManager {
    /// Open the item manager stored under the given path
    ///
    /// The snapshot lives in a `.todostore` subdirectory of the given path.
    /// Without a snapshot the manager starts empty. Repeated to-do items in
    /// the snapshot are dropped, keeping the first.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().join(STORE_DIR);

        fs::create_dir_all(&base_path).context("Failed to create store directory")?;

        Self::check_version(&base_path)?;

        let entries: Vec<SnapshotEntry> = jsonl::read_jsonl(&base_path.join(SNAPSHOT_FILE))?;

        let mut manager = Self {
            base_path,
            to_do: Vec::new(),
            done: Vec::new(),
        };

        for entry in entries {
            match entry.list {
                List::Todo => {
                    if !manager.add_item(entry.item) {
                        warn!(path = ?manager.base_path, "Dropped repeated to-do item from snapshot");
                    }
                }
                List::Done => manager.done.push(entry.item),
            }
        }

        debug!(
            path = ?manager.base_path,
            to_do = manager.to_do.len(),
            done = manager.done.len(),
            "Opened item manager"
        );

        Ok(manager)
    }

    /// Get the directory holding the snapshot files
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Number of items still to do
    pub fn to_do_count(&self) -> usize {
        self.to_do.len()
    }

    /// Number of items checked off
    pub fn done_count(&self) -> usize {
        self.done.len()
    }

    /// To-do items in insertion order
    pub fn to_do_items(&self) -> &[ToDoItem] {
        &self.to_do
    }

    /// Done items in the order they were checked
    pub fn done_items(&self) -> &[ToDoItem] {
        &self.done
    }

    /// Append an item to the to-do list
    ///
    /// Returns false, leaving the list untouched, when an equal item is
    /// already pending.
    pub fn add_item(&mut self, item: ToDoItem) -> bool {
        if self.to_do.contains(&item) {
            debug!(title = %item.title, "Item already pending, ignoring");
            return false;
        }
        self.to_do.push(item);
        true
    }

    /// Get the to-do item at `index`
    ///
    /// Panics when `index >= to_do_count()`.
    pub fn item_at_index(&self, index: usize) -> &ToDoItem {
        check_bounds("to-do", index, self.to_do.len());
        &self.to_do[index]
    }

    /// Get the done item at `index`
    ///
    /// Panics when `index >= done_count()`.
    pub fn done_item_at_index(&self, index: usize) -> &ToDoItem {
        check_bounds("done", index, self.done.len());
        &self.done[index]
    }

    /// Move the to-do item at `index` to the end of the done list
    pub fn check_item_at_index(&mut self, index: usize) {
        check_bounds("to-do", index, self.to_do.len());
        let item = self.to_do.remove(index);
        debug!(title = %item.title, index, "Checked item");
        self.done.push(item);
    }

    /// Move the done item at `index` back to the end of the to-do list
    ///
    /// When an equal item is already pending the done item is dropped
    /// instead, and false is returned.
    pub fn uncheck_item_at_index(&mut self, index: usize) -> bool {
        check_bounds("done", index, self.done.len());
        let item = self.done.remove(index);
        debug!(title = %item.title, index, "Unchecked item");
        self.add_item(item)
    }

    /// Delete the saved snapshot, then clear both lists
    ///
    /// On error the lists are left as they were.
    pub fn remove_all_items(&mut self) -> Result<()> {
        jsonl::remove_jsonl(&self.base_path.join(SNAPSHOT_FILE))
            .context("Failed to remove item snapshot")?;

        self.to_do.clear();
        self.done.clear();

        info!(path = ?self.base_path, "Removed all items");
        Ok(())
    }

    /// Write both lists to the snapshot file in one replace
    pub fn save_state(&self) -> Result<()> {
        let lines: Vec<SnapshotLine> = self
            .to_do
            .iter()
            .map(|item| SnapshotLine { list: List::Todo, item })
            .chain(self.done.iter().map(|item| SnapshotLine { list: List::Done, item }))
            .collect();

        jsonl::write_jsonl(&self.base_path.join(SNAPSHOT_FILE), &lines)
            .context("Failed to save item state")?;

        info!(
            path = ?self.base_path,
            to_do = self.to_do.len(),
            done = self.done.len(),
            "Saved item state"
        );
        Ok(())
    }

    /// React to a host lifecycle notification
    ///
    /// Only events that may precede suspension or exit persist state.
    pub fn handle_lifecycle(&self, event: LifecycleEvent) -> Result<()> {
        debug!(%event, "Lifecycle event");
        if event.requires_save() {
            self.save_state()?;
        }
        Ok(())
    }

    /// Write the version file, or check the existing one
    ///
    /// A snapshot from a different format version is refused rather than
    /// misread.
    fn check_version(base_path: &Path) -> Result<()> {
        let version_path = base_path.join(".version");
        if !version_path.exists() {
            fs::write(version_path, CURRENT_VERSION.to_string())?;
            return Ok(());
        }

        let content = fs::read_to_string(&version_path).context("Failed to read version file")?;
        let version: u32 = content
            .trim()
            .parse()
            .map_err(|e| eyre!("Invalid version file {:?}: {}", version_path, e))?;

        if version != CURRENT_VERSION {
            return Err(eyre!(
                "Unsupported store version {} (expected {})",
                version,
                CURRENT_VERSION
            ));
        }
        Ok(())
    }
}

fn check_bounds(list: &str, index: usize, len: usize) {
    assert!(
        index < len,
        "{} index out of range: the len is {} but the index is {}",
        list,
        len,
        index
    );
}
