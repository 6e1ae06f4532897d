use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::{CacheEntry, CacheStore};
use crate::error::Result;

/// One JSON file per topic, named by the SHA-256 of the topic.
#[derive(Debug, Clone)]
pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, topic: &str) -> PathBuf {
        let digest = Sha256::digest(topic.as_bytes());
        self.root.join(format!("{:x}.json", digest))
    }
}

impl CacheStore for FileCache {
    async fn lookup(&self, topic: &str) -> Result<Option<CacheEntry>> {
        let path = self.path_for(topic);
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let entry: CacheEntry = serde_json::from_str(&data)?;
        if entry.topic != topic {
            warn!("Cache file {} belongs to another topic, ignoring", path.display());
            return Ok(None);
        }
        Ok(Some(entry))
    }

    async fn store(&self, topic: &str, raw_text: &str, validated_text: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;

        let entry = CacheEntry::new(topic, raw_text, validated_text);
        let path = self.path_for(topic);
        let tmp = path.with_extension("json.tmp");

        tokio::fs::write(&tmp, serde_json::to_vec_pretty(&entry)?).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!("Cached script for '{}' at {}", topic, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "auto_manim_{name}_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ))
    }

    #[tokio::test]
    async fn entries_survive_a_new_handle() {
        let dir = temp_dir("file_cache_survives");
        FileCache::new(&dir)
            .store("Bayes' theorem", "raw", "validated")
            .await
            .unwrap();

        let reopened = FileCache::new(&dir);
        let entry = reopened.lookup("Bayes' theorem").await.unwrap().unwrap();
        assert_eq!(entry.validated_text, "validated");
        assert!(reopened.lookup("bayes' theorem").await.unwrap().is_none());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn missing_directory_is_a_miss() {
        let cache = FileCache::new(temp_dir("file_cache_missing"));
        assert!(cache.lookup("anything").await.unwrap().is_none());
    }

    #[test]
    fn file_names_are_hex_digests() {
        let cache = FileCache::new("/tmp/scripts");
        let name = cache.path_for("a/b").file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(name.len(), 64 + ".json".len());
        assert!(name.trim_end_matches(".json").chars().all(|c| c.is_ascii_hexdigit()));
    }
}
