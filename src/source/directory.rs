use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use super::{ChildEntry, FileEntry, FileSource, SourceError};

/// 基于本地目录的文件来源
pub struct DirectorySource {
    /// 扫描根目录（已规范化为绝对路径）
    root: PathBuf,

    /// 显示名称
    label: String,

    /// 是否跟随符号链接
    follow_symlinks: bool,
}

impl DirectorySource {
    /// 打开目录，根路径不存在或不是目录时立即返回错误
    pub fn new(root: impl AsRef<Path>) -> Result<Self, SourceError> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(SourceError::NotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(SourceError::NotADirectory(root.display().to_string()));
        }

        let root = fs::canonicalize(root).map_err(|source| SourceError::Io {
            path: root.display().to_string(),
            source,
        })?;

        let label = root
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("root")
            .to_string();

        Ok(Self {
            root,
            label,
            follow_symlinks: false,
        })
    }

    /// 设置是否跟随符号链接
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// 把逻辑路径映射到磁盘路径
    fn resolve(&self, path: &str) -> PathBuf {
        if path.is_empty() {
            self.root.clone()
        } else {
            self.root.join(path)
        }
    }

    /// 解析符号链接，断链或可能形成环的目录链接返回 `None`
    fn resolve_symlink(&self, dir: &Path, link: &Path, name: String) -> Option<ChildEntry> {
        let metadata = match fs::metadata(link) {
            Ok(metadata) => metadata,
            Err(err) => {
                tracing::warn!("跳过失效的符号链接 {}: {}", link.display(), err);
                return None;
            }
        };

        if !metadata.is_dir() {
            return Some(ChildEntry::file(name, metadata.len()));
        }

        self.link_target(dir, link)?;
        Some(ChildEntry::directory(name))
    }

    /// 目录链接的规范化目标，可能重复访问已有目录时返回 `None`
    ///
    /// 指向所在目录、其祖先或扫描根目录内部的链接都会被拒绝。
    fn link_target(&self, dir: &Path, link: &Path) -> Option<PathBuf> {
        let target = match fs::canonicalize(link) {
            Ok(target) => target,
            Err(err) => {
                tracing::warn!("无法解析符号链接 {}: {}", link.display(), err);
                return None;
            }
        };
        let current = fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());

        if current.starts_with(&target) || target.starts_with(&self.root) {
            tracing::warn!(
                "跳过可能形成环的符号链接 {} -> {}",
                link.display(),
                target.display()
            );
            return None;
        }

        Some(target)
    }

    /// 遍历时是否进入该条目，与 `list_children` 的链接规则一致
    fn should_walk(&self, entry: &DirEntry, skip_dir: &dyn Fn(&str) -> bool) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }
        if entry.file_name().to_str().map(skip_dir).unwrap_or(false) {
            return false;
        }
        if entry.path_is_symlink() {
            let dir = entry.path().parent().unwrap_or(entry.path());
            return self.link_target(dir, entry.path()).is_some();
        }
        true
    }
}

impl FileSource for DirectorySource {
    fn label(&self) -> &str {
        &self.label
    }

    fn list_children(&self, path: &str) -> Result<Vec<ChildEntry>, SourceError> {
        let dir = self.resolve(path);
        let entries = fs::read_dir(&dir).map_err(|source| SourceError::Io {
            path: path.to_string(),
            source,
        })?;

        let mut children = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!("读取目录 {} 的条目时出错: {}", dir.display(), err);
                    continue;
                }
            };

            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    tracing::warn!("跳过非 UTF-8 文件名: {:?}", raw);
                    continue;
                }
            };

            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(err) => {
                    tracing::warn!("无法获取 {} 的类型: {}", entry.path().display(), err);
                    continue;
                }
            };

            if file_type.is_symlink() {
                if !self.follow_symlinks {
                    tracing::debug!("跳过符号链接: {}", entry.path().display());
                    continue;
                }
                if let Some(child) = self.resolve_symlink(&dir, &entry.path(), name) {
                    children.push(child);
                }
                continue;
            }

            if file_type.is_dir() {
                children.push(ChildEntry::directory(name));
            } else {
                let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                children.push(ChildEntry::file(name, size));
            }
        }

        Ok(children)
    }

    fn read_bytes(&self, path: &str) -> Result<Vec<u8>, SourceError> {
        let file = self.resolve(path);
        if file.is_dir() {
            return Err(SourceError::NotAFile(path.to_string()));
        }
        fs::read(&file).map_err(|source| SourceError::Io {
            path: path.to_string(),
            source,
        })
    }

    fn modified(&self, path: &str) -> Option<DateTime<Utc>> {
        let metadata = fs::metadata(self.resolve(path)).ok()?;
        metadata.modified().ok().map(DateTime::<Utc>::from)
    }

    fn local_path(&self, path: &str) -> Option<PathBuf> {
        Some(self.resolve(path))
    }

    fn walk_files(&self, root: &str, skip_dir: &dyn Fn(&str) -> bool) -> Vec<FileEntry> {
        let start = self.resolve(root);
        let walker = WalkDir::new(&start)
            .follow_links(self.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| self.should_walk(entry, skip_dir));

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    // walkdir 在跟随链接时会把环报告为错误
                    tracing::warn!("遍历 {} 时出错: {}", start.display(), err);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let relative = match entry.path().strip_prefix(&self.root) {
                Ok(relative) => relative,
                Err(_) => continue,
            };
            let Some(path) = relative.to_str().and_then(super::normalize_path) else {
                tracing::warn!("跳过无法表示的路径: {}", entry.path().display());
                continue;
            };

            let metadata = entry.metadata().ok();
            let size = metadata.as_ref().map(|m| m.len()).unwrap_or(0);
            let modified = metadata
                .and_then(|m| m.modified().ok())
                .map(DateTime::<Utc>::from);
            files.push(FileEntry {
                path,
                size,
                modified,
            });
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }
}
