pub mod archive;
pub mod directory;

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use archive::{ArchiveSource, FileArchiveSource};
pub use directory::DirectorySource;

/// 文件来源错误
///
/// 根路径相关的错误（不存在、压缩包损坏）在构造时立即返回；
/// 单个条目的读取错误由调用方记录警告后跳过。
#[derive(Debug, Error)]
pub enum SourceError {
    /// 根路径不存在
    #[error("路径不存在: {0}")]
    NotFound(PathBuf),

    /// 既不是目录也不是可识别的压缩包
    #[error("不支持的输入（既不是目录也不是 zip 压缩包）: {0}")]
    Unsupported(PathBuf),

    /// 压缩包损坏或不是 zip 格式
    #[error("无法读取压缩包 {path}: {source}")]
    InvalidArchive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// 逻辑路径下没有对应条目
    #[error("条目不存在: {0}")]
    EntryNotFound(String),

    /// 对文件调用了目录操作
    #[error("不是目录: {0}")]
    NotADirectory(String),

    /// 对目录调用了文件操作
    #[error("不是文件: {0}")]
    NotAFile(String),

    /// 本地文件系统 I/O 错误
    #[error("读取 {path} 失败: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 压缩包条目读取错误
    #[error("读取压缩包条目 {path} 失败: {source}")]
    Archive {
        path: String,
        #[source]
        source: zip::result::ZipError,
    },

    /// 压缩包句柄的锁已被污染
    #[error("压缩包句柄不可用（锁已被污染）")]
    LockPoisoned,
}

/// 目录的直接子项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEntry {
    /// 条目名称（不含路径）
    pub name: String,

    /// 是否是目录
    pub is_dir: bool,

    /// 文件大小（目录为 0）
    pub size: u64,
}

impl ChildEntry {
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
            size,
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
            size: 0,
        }
    }
}

/// 递归遍历得到的文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// 逻辑路径（相对于来源根目录）
    pub path: String,

    /// 文件大小
    pub size: u64,

    /// 最后修改时间（来源没有记录时为 `None`）
    pub modified: Option<DateTime<Utc>>,
}

/// 只读的统一文件视图，目录和 zip 压缩包各有一个实现
///
/// 所有路径都是逻辑路径：以 `/` 分隔、相对于根目录、没有首尾分隔符，
/// 根目录用空字符串表示。
pub trait FileSource: Send + Sync {
    /// 来源的显示名称（目录名或压缩包文件名）
    fn label(&self) -> &str;

    /// 列出目录的直接子项（非递归）
    fn list_children(&self, path: &str) -> Result<Vec<ChildEntry>, SourceError>;

    /// 读取文件的原始字节
    fn read_bytes(&self, path: &str) -> Result<Vec<u8>, SourceError>;

    /// 文件的最后修改时间
    fn modified(&self, path: &str) -> Option<DateTime<Utc>>;

    /// 逻辑路径对应的本地磁盘路径，压缩包中的条目没有
    fn local_path(&self, _path: &str) -> Option<PathBuf> {
        None
    }

    /// 递归列出 `root` 下的所有文件，`skip_dir` 返回 true 的目录不会进入
    ///
    /// 无法读取的目录记录警告后跳过，结果按路径排序。
    fn walk_files(&self, root: &str, skip_dir: &dyn Fn(&str) -> bool) -> Vec<FileEntry> {
        let mut files = Vec::new();
        let mut pending = vec![root.to_string()];

        while let Some(dir) = pending.pop() {
            let children = match self.list_children(&dir) {
                Ok(children) => children,
                Err(err) => {
                    tracing::warn!("跳过无法读取的目录 {:?}: {}", dir, err);
                    continue;
                }
            };

            for child in children {
                let path = join_path(&dir, &child.name);
                if child.is_dir {
                    if !skip_dir(&child.name) {
                        pending.push(path);
                    }
                } else {
                    let modified = self.modified(&path);
                    files.push(FileEntry {
                        path,
                        size: child.size,
                        modified,
                    });
                }
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }
}

/// 根据输入路径选择文件来源：目录使用 `DirectorySource`，普通文件按 zip 打开
pub fn open_source(path: &Path, follow_symlinks: bool) -> Result<Box<dyn FileSource>, SourceError> {
    if !path.exists() {
        return Err(SourceError::NotFound(path.to_path_buf()));
    }

    if path.is_dir() {
        let source = DirectorySource::new(path)?.follow_symlinks(follow_symlinks);
        return Ok(Box::new(source));
    }

    if path.is_file() {
        return Ok(Box::new(ArchiveSource::open(path)?));
    }

    Err(SourceError::Unsupported(path.to_path_buf()))
}

/// 规范化逻辑路径：统一分隔符，去掉 `.` 段和首尾 `/`
///
/// 含有 `..` 的路径无法安全映射到根目录内，返回 `None`。
pub fn normalize_path(raw: &str) -> Option<String> {
    let unified = raw.replace('\\', "/");
    let mut parts = Vec::new();

    for part in unified.split('/') {
        match part {
            "" | "." => continue,
            ".." => return None,
            other => parts.push(other),
        }
    }

    Some(parts.join("/"))
}

/// 拼接父路径和子项名称
pub fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

/// 父目录的逻辑路径，根目录没有父目录
pub fn parent_path(path: &str) -> Option<&str> {
    if path.is_empty() {
        return None;
    }
    Some(path.rfind('/').map(|pos| &path[..pos]).unwrap_or(""))
}

/// 路径的最后一段
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// 路径深度，根目录为 0
pub fn path_depth(path: &str) -> usize {
    if path.is_empty() {
        0
    } else {
        path.matches('/').count() + 1
    }
}
