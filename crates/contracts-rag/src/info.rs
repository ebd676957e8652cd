use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use contracts_core::CollectionStats;

/// Everything the info views show about one collection.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionInfo {
    #[serde(flatten)]
    pub stats: CollectionStats,
    pub persist_dir: PathBuf,
    /// Size of the whole persist directory, shared by every collection in it.
    pub disk_size_bytes: u64,
    pub disk_size: String,
}

impl CollectionInfo {
    pub fn new(stats: CollectionStats, persist_dir: &Path) -> Self {
        let disk_size_bytes = directory_size(persist_dir);
        Self { stats, persist_dir: persist_dir.to_path_buf(), disk_size_bytes, disk_size: format_size(disk_size_bytes) }
    }
}

/// Total size of regular files under `path`; unreadable entries are skipped.
pub fn directory_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// `KB` below one MiB, `MB` from there, two decimals.
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    if bytes < MIB {
        format!("{:.2} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.2} MB", bytes as f64 / MIB as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_switch_unit_at_one_mebibyte() {
        assert_eq!(format_size(0), "0.00 KB");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(1024 * 1024 - 1), "1024.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn directory_size_sums_nested_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.bin"), vec![0u8; 100]).unwrap();
        std::fs::create_dir(tmp.path().join("nested")).unwrap();
        std::fs::write(tmp.path().join("nested/b.bin"), vec![0u8; 28]).unwrap();
        assert_eq!(directory_size(tmp.path()), 128);
        assert_eq!(directory_size(&tmp.path().join("missing")), 0);
    }
}
