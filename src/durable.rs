//! File-backed [`crate::cache::DurableStore`], grounded on the teacher's
//! `FileRegistryClient` — one JSON document per entry under a root
//! directory, looked up by a sanitized path instead of an in-process map.

use crate::cache::DurableStore;
use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

pub struct FileDurableStore {
    root: PathBuf,
}

impl FileDurableStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn entry_path(&self, name: &str, version_key: &str) -> PathBuf {
        self.root
            .join(urlencoding::encode(name).into_owned())
            .join(format!("{}.json", urlencoding::encode(version_key)))
    }
}

impl DurableStore for FileDurableStore {
    fn get(&self, name: &str, version_key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.entry_path(name, version_key);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn upsert(&self, name: &str, version_key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.entry_path(name, version_key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        Ok(())
    }

    fn iter_all(&self) -> Result<Vec<((String, String), Vec<u8>)>> {
        let mut out = Vec::new();
        if !self.root.exists() {
            return Ok(out);
        }
        for name_entry in fs::read_dir(&self.root)? {
            let name_entry = name_entry?;
            if !name_entry.file_type()?.is_dir() {
                continue;
            }
            let Some(name) = decode_component(&name_entry.file_name()) else {
                continue;
            };
            for version_entry in fs::read_dir(name_entry.path())? {
                let version_entry = version_entry?;
                if !version_entry.file_type()?.is_file() {
                    continue;
                }
                let file_name = version_entry.file_name();
                let Some(stem) = Path::new(&file_name)
                    .file_stem()
                    .and_then(|s| s.to_str())
                else {
                    continue;
                };
                let Ok(version_key) = urlencoding::decode(stem) else {
                    continue;
                };
                let bytes = fs::read(version_entry.path())?;
                out.push(((name.clone(), version_key.into_owned()), bytes));
            }
        }
        Ok(out)
    }
}

fn decode_component(os: &std::ffi::OsStr) -> Option<String> {
    let s = os.to_str()?;
    urlencoding::decode(s).ok().map(|c| c.into_owned())
}
