//! Font directory resolution for subtitle rendering.
//!
//! The subtitles filter takes a `fontsdir` argument; this maps requested
//! family names to directories likely to contain them. Lookups scan the
//! platform font directories once per family set and are cached until
//! explicitly cleared.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

const FONT_EXTENSIONS: &[&str] = &["ttf", "otf", "ttc"];

/// Resolves subtitle font families to search directories.
pub struct FontCatalog {
    extra_dirs: Vec<PathBuf>,
    cache: Mutex<HashMap<String, Vec<PathBuf>>>,
}

impl Default for FontCatalog {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl FontCatalog {
    pub fn new(extra_dirs: Vec<PathBuf>) -> Self {
        Self {
            extra_dirs,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Directories to hand to the subtitles filter for these families.
    ///
    /// Directories containing a matching font file come first; when no
    /// family matches anything, all search roots are returned so the
    /// renderer can still fall back to fontconfig defaults.
    pub fn dirs_for_families(&self, families: &[String]) -> Vec<PathBuf> {
        let key = families.join("\u{1f}");
        if let Some(hit) = self.cache.lock().get(&key) {
            return hit.clone();
        }

        let roots = self.search_roots();
        let mut dirs = Vec::new();
        for family in families {
            let needle = normalize(family);
            for root in &roots {
                if dir_contains_family(root, &needle) && !dirs.contains(root) {
                    dirs.push(root.clone());
                }
            }
        }
        if dirs.is_empty() {
            debug!(families = ?families, "no font match, using all search roots");
            dirs = roots;
        }

        self.cache.lock().insert(key, dirs.clone());
        dirs
    }

    /// Drop all cached lookups.
    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    fn search_roots(&self) -> Vec<PathBuf> {
        let mut roots = self.extra_dirs.clone();
        for dir in platform_font_dirs() {
            if dir.is_dir() && !roots.contains(&dir) {
                roots.push(dir);
            }
        }
        roots
    }
}

fn platform_font_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    #[cfg(target_os = "linux")]
    {
        dirs.push(PathBuf::from("/usr/share/fonts"));
        dirs.push(PathBuf::from("/usr/local/share/fonts"));
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(home).join(".local/share/fonts"));
        }
    }
    #[cfg(target_os = "macos")]
    {
        dirs.push(PathBuf::from("/System/Library/Fonts"));
        dirs.push(PathBuf::from("/Library/Fonts"));
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(home).join("Library/Fonts"));
        }
    }
    #[cfg(target_os = "windows")]
    {
        dirs.push(PathBuf::from(r"C:\Windows\Fonts"));
    }
    dirs
}

/// Shallow scan: a directory matches when any font file's stem contains
/// the normalized family name.
fn dir_contains_family(dir: &Path, needle: &str) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let is_font = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| FONT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if !is_font {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            if normalize(stem).contains(needle) {
                return true;
            }
        }
    }
    false
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .collect::<String>()
        .to_ascii_lowercase()
}
