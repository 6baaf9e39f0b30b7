// JSONL snapshot file operations

use eyre::{Context, Result};
use fs2::FileExt;
use serde::{Serialize, de::DeserializeOwned};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Replace a JSONL file with the given records, one per line, in order
///
/// Writers serialize on an exclusive lock over a sibling `.lock` file, which
/// is never truncated or renamed. Under that lock the records are written to
/// a sibling `.tmp` file, flushed, then renamed over `path`.
pub fn write_jsonl<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let tmp_path = path.with_extension("jsonl.tmp");

    let lock = OpenOptions::new()
        .create(true)
        .append(true)
        .open(lock_path(path))
        .context("Failed to open JSONL lock file")?;

    // Acquire exclusive lock before touching the temp file
    lock.lock_exclusive().context("Failed to acquire file lock")?;

    {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)
            .context("Failed to open JSONL temp file for writing")?;

        for record in records {
            let json = serde_json::to_string(record)?;
            writeln!(file, "{}", json)?;
        }
        file.sync_all()?; // Ensure data is flushed to disk
    }

    fs::rename(&tmp_path, path).context("Failed to finalize JSONL file")?;

    // Lock is automatically released when `lock` is dropped
    debug!(file = ?path, count = records.len(), "Wrote JSONL snapshot");
    Ok(())
}

/// Path of the lock file guarding writes to `path`
pub fn lock_path(path: &Path) -> PathBuf {
    path.with_extension("jsonl.lock")
}

/// Read all records from a JSONL file in file order
///
/// A missing file yields no records. Blank lines and lines that fail to
/// parse are skipped. A read error ends the file early.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e).context("Failed to open JSONL file"),
    };

    let reader = BufReader::new(file);
    let mut records = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                // An I/O error repeats on every further read, so stop here
                warn!(
                    file = ?path,
                    line = line_num + 1,
                    error = ?e,
                    "Failed to read line, ignoring the rest of the file"
                );
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(
                    file = ?path,
                    line = line_num + 1,
                    error = ?e,
                    "Failed to parse JSON, skipping"
                );
            }
        }
    }

    debug!(file = ?path, count = records.len(), "Loaded records from JSONL");
    Ok(records)
}

/// Delete a JSONL file, ignoring one that is already gone
pub fn remove_jsonl(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).context("Failed to remove JSONL file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ToDoItem;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_write_jsonl() {
        let temp = TempDir::new().unwrap();
        let jsonl_path = temp.path().join("test.jsonl");

        write_jsonl(&jsonl_path, &[ToDoItem::new("first"), ToDoItem::new("second")]).unwrap();

        let content = fs::read_to_string(&jsonl_path).unwrap();
        assert_eq!(content, "{\"title\":\"first\"}\n{\"title\":\"second\"}\n");
        assert!(!temp.path().join("test.jsonl.tmp").exists());
    }

    #[test]
    fn test_write_jsonl_replaces_previous_content() {
        let temp = TempDir::new().unwrap();
        let jsonl_path = temp.path().join("test.jsonl");

        write_jsonl(&jsonl_path, &[ToDoItem::new("old")]).unwrap();
        write_jsonl(&jsonl_path, &[ToDoItem::new("new")]).unwrap();

        let records: Vec<ToDoItem> = read_jsonl(&jsonl_path).unwrap();
        assert_eq!(records, vec![ToDoItem::new("new")]);
    }

    #[test]
    fn test_write_empty_slice_leaves_empty_file() {
        let temp = TempDir::new().unwrap();
        let jsonl_path = temp.path().join("test.jsonl");

        write_jsonl::<ToDoItem>(&jsonl_path, &[]).unwrap();

        assert!(jsonl_path.exists());
        let records: Vec<ToDoItem> = read_jsonl(&jsonl_path).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_read_jsonl_preserves_order() {
        let temp = TempDir::new().unwrap();
        let jsonl_path = temp.path().join("test.jsonl");
        let items = vec![ToDoItem::new("c"), ToDoItem::new("a"), ToDoItem::new("b")];

        write_jsonl(&jsonl_path, &items).unwrap();

        let records: Vec<ToDoItem> = read_jsonl(&jsonl_path).unwrap();
        assert_eq!(records, items);
    }

    #[test]
    fn test_read_jsonl_nonexistent_file() {
        let temp = TempDir::new().unwrap();
        let jsonl_path = temp.path().join("nonexistent.jsonl");

        let records: Vec<ToDoItem> = read_jsonl(&jsonl_path).unwrap();
        assert_eq!(records.len(), 0);
    }

    #[test]
    fn test_read_jsonl_malformed_line() {
        let temp = TempDir::new().unwrap();
        let jsonl_path = temp.path().join("test.jsonl");

        // Valid record, malformed line, blank line, another valid record
        fs::write(
            &jsonl_path,
            "{\"title\":\"valid\"}\n{malformed json}\n\n{\"title\":\"also valid\"}\n",
        )
        .unwrap();

        let records: Vec<ToDoItem> = read_jsonl(&jsonl_path).unwrap();
        assert_eq!(records, vec![ToDoItem::new("valid"), ToDoItem::new("also valid")]);
    }

    #[test]
    fn test_write_jsonl_waits_for_lock_holder() {
        let temp = TempDir::new().unwrap();
        let jsonl_path = temp.path().join("test.jsonl");
        write_jsonl(&jsonl_path, &[ToDoItem::new("old")]).unwrap();

        // Another writer holds the lock
        let holder = OpenOptions::new()
            .create(true)
            .append(true)
            .open(lock_path(&jsonl_path))
            .unwrap();
        holder.lock_exclusive().unwrap();

        let writer_path = jsonl_path.clone();
        let writer = thread::spawn(move || write_jsonl(&writer_path, &[ToDoItem::new("new")]));

        thread::sleep(Duration::from_millis(200));

        // The blocked writer has not touched the temp file or the target
        assert!(!temp.path().join("test.jsonl.tmp").exists());
        let records: Vec<ToDoItem> = read_jsonl(&jsonl_path).unwrap();
        assert_eq!(records, vec![ToDoItem::new("old")]);

        drop(holder);
        writer.join().unwrap().unwrap();

        let records: Vec<ToDoItem> = read_jsonl(&jsonl_path).unwrap();
        assert_eq!(records, vec![ToDoItem::new("new")]);
    }

    #[test]
    fn test_write_jsonl_failure_keeps_previous_file() {
        let temp = TempDir::new().unwrap();
        let jsonl_path = temp.path().join("test.jsonl");
        write_jsonl(&jsonl_path, &[ToDoItem::new("old")]).unwrap();

        // A directory in the way of the temp file makes the write fail
        fs::create_dir(temp.path().join("test.jsonl.tmp")).unwrap();

        assert!(write_jsonl(&jsonl_path, &[ToDoItem::new("new")]).is_err());

        let records: Vec<ToDoItem> = read_jsonl(&jsonl_path).unwrap();
        assert_eq!(records, vec![ToDoItem::new("old")]);
    }

    #[test]
    fn test_remove_jsonl() {
        let temp = TempDir::new().unwrap();
        let jsonl_path = temp.path().join("test.jsonl");

        write_jsonl(&jsonl_path, &[ToDoItem::new("item")]).unwrap();
        remove_jsonl(&jsonl_path).unwrap();
        assert!(!jsonl_path.exists());

        // Removing again is fine
        remove_jsonl(&jsonl_path).unwrap();
    }
}
