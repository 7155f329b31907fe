use crate::config::Config;
use crate::error::{Error, Result};
use crate::node_type::NodeId;
use crate::store::Store;
use memmap::Mmap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::trace;

const RECORD_PREFIX: &str = "b";
const RECORD_EXTENSION: &str = "node";

/// Store keeping each record in its own file, `b{id}.node`, inside one directory.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    sync_writes: bool,
}

impl FileStore {
    /// Opens (creating if needed) the directory holding the node files.
    pub fn open(dir: &Path) -> Result<FileStore> {
        fs::create_dir_all(dir)?;
        Ok(FileStore {
            dir: dir.to_path_buf(),
            sync_writes: false,
        })
    }

    /// Opens the directory with the write behavior named by `config`.
    pub fn with_config(dir: &Path, config: &Config) -> Result<FileStore> {
        Ok(FileStore::open(dir)?.sync_writes(config.sync_writes))
    }

    /// When set, every record is flushed to the device before `save` returns.
    pub fn sync_writes(mut self, sync_writes: bool) -> FileStore {
        self.sync_writes = sync_writes;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: NodeId) -> PathBuf {
        self.dir.join(record_name(id))
    }
}

fn record_name(id: NodeId) -> String {
    format!("{}{}.{}", RECORD_PREFIX, id.0, RECORD_EXTENSION)
}

// Parses `b{id}.node`. Only the exact name `record_name` produces counts as a
// record, so `b+7.node` or `b07.node` are ignored.
fn parse_record_name(name: &str) -> Option<NodeId> {
    let stem = name.strip_suffix(RECORD_EXTENSION)?.strip_suffix('.')?;
    let id = NodeId(stem.strip_prefix(RECORD_PREFIX)?.parse::<i32>().ok()?);
    if record_name(id) != name {
        return None;
    }
    Some(id)
}

impl Store for FileStore {
    fn load(&self, id: NodeId) -> Result<Vec<u8>> {
        let path = self.path_for(id);
        let fd = match File::open(&path) {
            Ok(fd) => fd,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(Error::NotFound(id)),
            Err(e) => return Err(e.into()),
        };
        // Empty files cannot be mapped; they decode as truncated records.
        if fd.metadata()?.len() == 0 {
            return Ok(Vec::new());
        }
        // The file is only read through the map and is not shared with other writers.
        let map = unsafe { Mmap::map(&fd)? };
        trace!(id = %id, path = %path.display(), len = map.len(), "mapped node file");
        Ok(map.to_vec())
    }

    fn save(&mut self, id: NodeId, data: &[u8]) -> Result<()> {
        let mut fd = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(self.path_for(id))?;
        fd.write_all(data)?;
        if self.sync_writes {
            fd.sync_all()?;
        }
        Ok(())
    }

    fn delete(&mut self, id: NodeId) -> Result<()> {
        match fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn ids(&self) -> Result<Vec<NodeId>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if let Some(id) = entry.file_name().to_str().and_then(parse_record_name) {
                ids.push(id);
            }
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_names() {
        assert_eq!(parse_record_name("b12.node"), Some(NodeId(12)));
        assert_eq!(parse_record_name("b-3.node"), Some(NodeId(-3)));
        assert_eq!(parse_record_name("b12.tmp"), None);
        assert_eq!(parse_record_name("c12.node"), None);
        assert_eq!(parse_record_name("bx.node"), None);
        assert_eq!(parse_record_name("b+3.node"), None);
        assert_eq!(parse_record_name("b03.node"), None);
        assert_eq!(parse_record_name("b-0.node"), None);
    }

    #[test]
    fn ids_skip_files_that_only_look_like_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        store.save(NodeId(1), &[1]).unwrap();
        File::create(dir.path().join("b+77.node")).unwrap();
        File::create(dir.path().join("b077.node")).unwrap();
        assert_eq!(store.ids().unwrap(), vec![NodeId(1)]);
    }

    #[test]
    fn round_trips_records_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap().sync_writes(true);

        store.save(NodeId(4), &[1, 2, 3]).unwrap();
        assert!(dir.path().join("b4.node").exists());
        assert_eq!(store.load(NodeId(4)).unwrap(), vec![1, 2, 3]);

        store.save(NodeId(4), &[9]).unwrap();
        assert_eq!(store.load(NodeId(4)).unwrap(), vec![9]);
        assert_eq!(store.ids().unwrap(), vec![NodeId(4)]);

        store.delete(NodeId(4)).unwrap();
        store.delete(NodeId(4)).unwrap();
        assert!(matches!(store.load(NodeId(4)), Err(Error::NotFound(NodeId(4)))));
    }

    #[test]
    fn empty_file_loads_as_empty_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        File::create(dir.path().join("b1.node")).unwrap();
        assert!(store.load(NodeId(1)).unwrap().is_empty());
    }
}
