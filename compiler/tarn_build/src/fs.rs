//! File-system boundary.
//!
//! The orchestrator reads sources and writes artifacts only through
//! [`FileSystem`], so a build can run against disk or entirely in memory.

use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

/// Line-oriented file access.
pub trait FileSystem: Send + Sync {
    fn read_all_lines(&self, path: &str) -> io::Result<Vec<String>>;

    fn write_all_lines(&self, path: &str, lines: &[String]) -> io::Result<()>;
}

/// Files under a root directory. Relative paths resolve against the root.
#[derive(Clone, Debug)]
pub struct DiskFileSystem {
    root: PathBuf,
}

impl DiskFileSystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DiskFileSystem { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl FileSystem for DiskFileSystem {
    fn read_all_lines(&self, path: &str) -> io::Result<Vec<String>> {
        let file = fs::File::open(self.resolve(path))?;
        BufReader::new(file).lines().collect()
    }

    fn write_all_lines(&self, path: &str, lines: &[String]) -> io::Result<()> {
        let path = self.resolve(path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = io::BufWriter::new(fs::File::create(path)?);
        for line in lines {
            writeln!(file, "{line}")?;
        }
        file.flush()
    }
}

/// In-memory files keyed by path.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: RwLock<FxHashMap<String, Vec<String>>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `text` (split on line breaks) at `path`.
    pub fn insert(&self, path: impl Into<String>, text: &str) {
        let lines = text.lines().map(str::to_string).collect();
        self.files.write().insert(path.into(), lines);
    }

    pub fn get(&self, path: &str) -> Option<Vec<String>> {
        self.files.read().get(path).cloned()
    }

    pub fn remove(&self, path: &str) -> Option<Vec<String>> {
        self.files.write().remove(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.read().contains_key(path)
    }

    /// Every stored path, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.files.read().keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_all_lines(&self, path: &str) -> io::Result<Vec<String>> {
        self.get(path).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no such file: {path}"))
        })
    }

    fn write_all_lines(&self, path: &str, lines: &[String]) -> io::Result<()> {
        self.files.write().insert(path.to_string(), lines.to_vec());
        Ok(())
    }
}
