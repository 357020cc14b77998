//! Writing downloaded pages to disk
//!
//! Layout: `<destination_root>/<item_id>/<kind><seq>.html`, overwritten on re-save.

use crate::error::SaveError;
use crate::types::ResourceId;
use encoding_rs::Encoding;
use std::path::PathBuf;

/// Persistence adapter rooted at a destination directory
#[derive(Clone, Debug)]
pub struct PageStorage {
    root: PathBuf,
}

impl PageStorage {
    /// Create a storage writing under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// File a resource is saved to
    pub fn path_for(&self, id: &ResourceId) -> PathBuf {
        self.root.join(id.item_id.as_str()).join(id.file_name())
    }

    /// Write `text` for `id`, encoded as `encoding`
    ///
    /// Creates the item directory when missing and overwrites an existing file.
    pub async fn save(
        &self,
        id: &ResourceId,
        text: &str,
        encoding: &'static Encoding,
    ) -> Result<PathBuf, SaveError> {
        let path = self.path_for(id);
        let dir = self.root.join(id.item_id.as_str());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| SaveError::CreateDir {
                path: dir.clone(),
                source,
            })?;

        // UTF-16 and replacement labels are written as UTF-8
        let (bytes, _, had_unmappable) = encoding.encode(text);
        if had_unmappable {
            return Err(SaveError::Unencodable {
                path,
                encoding: encoding.name().to_string(),
            });
        }

        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|source| SaveError::Write {
                path: path.clone(),
                source,
            })?;

        Ok(path)
    }
}
