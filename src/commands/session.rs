use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{EngineConfig, SegmentConfig};
use crate::error::CoreResult;
use crate::ingest::read_grid;
use crate::model::{Grid, Layout};
use crate::service::Engine;
use crate::util::{now_utc_string, read_json, sha256_file, write_json_pretty};

const LAYOUT_DIR: &str = "layouts";

/// Engine settings that change what `detect` produces for the same bytes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectSettings {
    pub max_cells: u64,
    pub segment: SegmentConfig,
}

impl From<&EngineConfig> for DetectSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            max_cells: config.max_cells,
            segment: config.segment,
        }
    }
}

/// Layout state of one grid file, keyed by the file's content hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedLayout {
    pub grid_sha256: String,
    pub source_path: String,
    pub updated_at: String,
    /// Missing in entries written before settings were recorded.
    #[serde(default)]
    pub settings: Option<DetectSettings>,
    pub layout: Layout,
}

/// Cached layouts under one cache root. Entries detected with other
/// settings read as missing.
pub struct LayoutCache {
    dir: PathBuf,
    settings: DetectSettings,
}

impl LayoutCache {
    pub fn new(cache_root: &Path, settings: DetectSettings) -> Self {
        Self {
            dir: cache_root.join(LAYOUT_DIR),
            settings,
        }
    }

    fn path_for(&self, sha256: &str) -> PathBuf {
        self.dir.join(format!("{sha256}.json"))
    }

    pub fn load(&self, sha256: &str) -> Result<Option<Layout>> {
        let path = self.path_for(sha256);
        if !path.exists() {
            return Ok(None);
        }
        let cached: CachedLayout = read_json(&path)?;
        if cached.settings != Some(self.settings) {
            debug!(path = %path.display(), "cached layout was detected with other settings");
            return Ok(None);
        }
        debug!(path = %path.display(), updated_at = %cached.updated_at, "loaded cached layout");
        Ok(Some(cached.layout))
    }

    pub fn store(&self, sha256: &str, source: &Path, layout: &Layout) -> Result<()> {
        let path = self.path_for(sha256);
        let cached = CachedLayout {
            grid_sha256: sha256.to_string(),
            source_path: source.display().to_string(),
            updated_at: now_utc_string(),
            settings: Some(self.settings),
            layout: layout.clone(),
        };
        write_json_pretty(&path, &cached)?;
        debug!(path = %path.display(), "cached layout");
        Ok(())
    }

    pub fn count(&self) -> Result<usize> {
        if !self.dir.exists() {
            return Ok(0);
        }

        let mut count = 0;
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("failed to read {}", self.dir.display()))?;
        for entry in entries {
            let entry =
                entry.with_context(|| format!("failed to read entry in {}", self.dir.display()))?;
            let is_json = entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("json"))
                .unwrap_or(false);
            if is_json {
                count += 1;
            }
        }
        Ok(count)
    }
}

pub struct GridFile {
    pub path: PathBuf,
    pub sha256: String,
    pub grid: Grid,
}

impl GridFile {
    pub fn open(path: &Path) -> Result<Self> {
        let grid = read_grid(path)?;
        let sha256 = sha256_file(path)?;
        let extent = grid.extent();
        info!(
            grid = %path.display(),
            rows = extent.rows,
            cols = extent.cols,
            occupied = grid.occupied_count(),
            "loaded grid"
        );
        Ok(Self {
            path: path.to_path_buf(),
            sha256,
            grid,
        })
    }

    /// Like `open`, but keeps an ingestion failure as a value for batch slots.
    pub fn try_open(path: &Path) -> (Option<String>, CoreResult<Grid>) {
        match read_grid(path) {
            Ok(grid) => (sha256_file(path).ok(), Ok(grid)),
            Err(err) => (None, Err(err)),
        }
    }
}

/// The cached layout of `file`, or a fresh detection that is then cached.
pub fn current_layout(
    engine: &Engine<'_>,
    cache: &LayoutCache,
    file: &GridFile,
    fresh: bool,
) -> Result<Layout> {
    if !fresh {
        if let Some(layout) = cache.load(&file.sha256)? {
            return Ok(layout);
        }
    }

    let layout = engine
        .detect(&file.grid)
        .with_context(|| format!("failed to detect blocks in {}", file.path.display()))?;
    cache.store(&file.sha256, &file.path, &layout)?;
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TemplateStore;

    fn write_grid(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn cached_layout_is_reused_until_refreshed() {
        let dir = tempfile::tempdir().unwrap();
        let store = TemplateStore::open_in(dir.path()).unwrap();
        let config = EngineConfig::default();
        let engine = Engine::new(&config, &store);
        let cache = LayoutCache::new(dir.path(), DetectSettings::from(&config));

        let path = write_grid(dir.path(), "a.csv", "a,b\n1,2\n");
        let file = GridFile::open(&path).unwrap();
        assert_eq!(cache.count().unwrap(), 0);

        let layout = current_layout(&engine, &cache, &file, false).unwrap();
        assert_eq!(layout.len(), 1);
        assert_eq!(cache.count().unwrap(), 1);

        let key = layout.key_at(0).unwrap();
        let labelled = engine.annotate(&layout, key, "Table").unwrap();
        cache.store(&file.sha256, &file.path, &labelled).unwrap();

        let reused = current_layout(&engine, &cache, &file, false).unwrap();
        assert_eq!(reused.blocks[0].annotation.as_deref(), Some("Table"));

        let fresh = current_layout(&engine, &cache, &file, true).unwrap();
        assert!(fresh.blocks[0].annotation.is_none());
        assert_eq!(cache.count().unwrap(), 1);
    }

    #[test]
    fn identical_content_shares_one_cache_entry() {
        let dir = tempfile::tempdir().unwrap();
        let first = GridFile::open(&write_grid(dir.path(), "a.csv", "x,y\n")).unwrap();
        let second = GridFile::open(&write_grid(dir.path(), "b.csv", "x,y\n")).unwrap();
        assert_eq!(first.sha256, second.sha256);

        let cache = LayoutCache::new(dir.path(), DetectSettings::from(&EngineConfig::default()));
        assert!(cache.load(&first.sha256).unwrap().is_none());
    }

    #[test]
    fn changed_detection_settings_miss_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let store = TemplateStore::open_in(dir.path()).unwrap();
        let path = write_grid(dir.path(), "a.csv", ",H,H,H\n\nx,y,z\nx,y,z\n");
        let file = GridFile::open(&path).unwrap();

        let loose = EngineConfig::default();
        let loose_cache = LayoutCache::new(dir.path(), DetectSettings::from(&loose));
        let engine = Engine::new(&loose, &store);
        let merged = current_layout(&engine, &loose_cache, &file, false).unwrap();
        assert_eq!(merged.len(), 1);

        let mut strict = EngineConfig::default();
        strict.segment.min_overlap = 0.9;
        let strict_cache = LayoutCache::new(dir.path(), DetectSettings::from(&strict));
        assert!(strict_cache.load(&file.sha256).unwrap().is_none());

        let engine = Engine::new(&strict, &store);
        let split = current_layout(&engine, &strict_cache, &file, false).unwrap();
        assert_eq!(split.len(), 2);
        assert!(loose_cache.load(&file.sha256).unwrap().is_none());
    }

    #[test]
    fn entries_without_recorded_settings_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LayoutCache::new(dir.path(), DetectSettings::from(&EngineConfig::default()));
        let legacy = serde_json::json!({
            "grid_sha256": "abc",
            "source_path": "a.csv",
            "updated_at": "2026-01-01T00:00:00Z",
            "layout": Layout::default(),
        });
        write_json_pretty(&cache.path_for("abc"), &legacy).unwrap();

        assert!(cache.load("abc").unwrap().is_none());
    }

    #[test]
    fn try_open_keeps_ingestion_errors() {
        let dir = tempfile::tempdir().unwrap();
        let (sha256, grid) = GridFile::try_open(&dir.path().join("missing.csv"));
        assert!(sha256.is_none());
        assert_eq!(grid.unwrap_err().kind(), "invalid_file");
    }
}
