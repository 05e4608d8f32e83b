use glob::Pattern;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::error_log::ErrorLog;
use crate::extract::extract_links_from_file;
use crate::{ErrorKind, Excludes, LinkRecord, Result};

/// File extensions that are scanned for links
pub const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "html"];

/// Dependency, build output, VCS metadata and icon asset directories
const IGNORED_DIRS: &[&str] = &[
    "node_modules",
    "dist",
    "build",
    ".git",
    ".turbo",
    "coverage",
    "icons",
    "svg",
];

/// Test and story files
const IGNORED_FILES: &[&str] = &["*.stories.*", "*.test.*"];

/// Walks a source tree and collects the external links found in it.
#[derive(Debug, Clone)]
pub struct Collector {
    root: PathBuf,
    excludes: Excludes,
    ignored_files: Vec<Pattern>,
}

impl Collector {
    /// Create a collector for the tree under `root`.
    /// A relative root is resolved against the working directory.
    pub fn new<P: AsRef<Path>>(root: P, excludes: Excludes) -> Result<Self> {
        let root = root.as_ref();
        let root = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|e| ErrorKind::io(root, e))?
                .join(root)
        };
        let ignored_files = IGNORED_FILES
            .iter()
            .map(|p| Pattern::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Collector {
            root,
            excludes,
            ignored_files,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_ignored_dir(entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| IGNORED_DIRS.contains(&name))
    }

    fn is_source_file(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        let has_extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext));
        has_extension && !self.ignored_files.iter().any(|p| p.matches(name))
    }

    /// Enumerate candidate source files below the root.
    ///
    /// Entries the walker cannot read are logged and skipped. Matches are not
    /// guaranteed to be regular files; callers check that themselves.
    pub fn files(&self, log: &ErrorLog) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !Self::is_ignored_dir(e));

        for entry in walker {
            match entry {
                Ok(entry) => {
                    if self.is_source_file(entry.path()) {
                        files.push(entry.into_path());
                    }
                }
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf);
                    log.append(&format!("Error walking source tree: {e}"), path.as_deref())
                        .map_err(|e| ErrorKind::io(log.path(), e))?;
                }
            }
        }
        debug!("Found {} source files under {}", files.len(), self.root.display());
        Ok(files)
    }

    /// Extract links from `files`, keeping the first file each URL appears in.
    ///
    /// Files that cannot be inspected or read are logged and skipped.
    /// Anything that is not a regular file is skipped silently.
    pub fn collect_links(&self, files: &[PathBuf], log: &ErrorLog) -> Result<Vec<LinkRecord>> {
        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for file in files {
            let urls = match fs::symlink_metadata(file) {
                Ok(metadata) if !metadata.is_file() => continue,
                Ok(_) => extract_links_from_file(file, &self.excludes),
                Err(e) => Err(ErrorKind::io(file, e)),
            };
            let urls = match urls {
                Ok(urls) => urls,
                Err(e) => {
                    log.append(&format!("Error processing file: {e}"), Some(file.as_path()))
                        .map_err(|e| ErrorKind::io(log.path(), e))?;
                    continue;
                }
            };
            for url in urls {
                if seen.insert(url.clone()) {
                    links.push(LinkRecord::new(file.clone(), url));
                }
            }
        }
        Ok(links)
    }
}
