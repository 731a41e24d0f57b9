use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use std::sync::Mutex;
use zip::ZipArchive;

use super::{base_name, normalize_path, parent_path, ChildEntry, FileSource, SourceError};

/// 打开磁盘上 zip 文件得到的来源
pub type FileArchiveSource = ArchiveSource<BufReader<File>>;

/// macOS 压缩时附带的资源分叉目录
const MACOS_METADATA_DIR: &str = "__MACOSX";

/// 基于 zip 压缩包的文件来源
///
/// 构造时一次性建立目录索引，之后的 `list_children` 只查内存索引。
pub struct ArchiveSource<R> {
    /// 显示名称（压缩包文件名，不含扩展名）
    label: String,

    /// 压缩包句柄，仅 `read_bytes` 需要
    archive: Mutex<ZipArchive<R>>,

    /// 目录 -> 直接子项（按压缩包条目顺序）
    directories: HashMap<String, Vec<ChildEntry>>,

    /// 文件 -> 压缩包内的条目
    files: HashMap<String, ArchiveFile>,
}

/// 索引中的文件条目
#[derive(Debug, Clone, Copy)]
struct ArchiveFile {
    /// 压缩包内的条目下标
    index: usize,

    /// 条目记录的修改时间
    modified: Option<DateTime<Utc>>,
}

/// 索引构建时的中间条目
struct IndexedEntry {
    path: String,
    is_dir: bool,
    index: usize,
    size: u64,
    modified: Option<DateTime<Utc>>,
}

impl FileArchiveSource {
    /// 打开磁盘上的 zip 文件
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        if !path.exists() {
            return Err(SourceError::NotFound(path.to_path_buf()));
        }

        let file = File::open(path).map_err(|source| SourceError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let label = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("archive")
            .to_string();

        let archive = ZipArchive::new(BufReader::new(file)).map_err(|source| {
            SourceError::InvalidArchive {
                path: path.to_path_buf(),
                source,
            }
        })?;

        Ok(Self::from_archive(label, archive))
    }
}

impl<R: Read + Seek> ArchiveSource<R> {
    /// 从任意 reader 打开 zip（例如内存中的 `Cursor<Vec<u8>>`）
    pub fn from_reader(label: impl Into<String>, reader: R) -> Result<Self, SourceError> {
        let label = label.into();
        let archive = ZipArchive::new(reader).map_err(|source| SourceError::InvalidArchive {
            path: label.clone().into(),
            source,
        })?;
        Ok(Self::from_archive(label, archive))
    }

    fn from_archive(label: String, mut archive: ZipArchive<R>) -> Self {
        let entries = Self::read_entries(&mut archive);
        let (directories, files) = Self::build_index(entries);

        tracing::debug!(
            "压缩包 {} 索引完成: {} 个目录, {} 个文件",
            label,
            directories.len(),
            files.len()
        );

        Self {
            label,
            archive: Mutex::new(archive),
            directories,
            files,
        }
    }

    /// 读取中央目录中的条目信息（不解压）
    fn read_entries(archive: &mut ZipArchive<R>) -> Vec<IndexedEntry> {
        let mut entries = Vec::with_capacity(archive.len());
        let mut skipped_metadata = 0usize;

        for index in 0..archive.len() {
            let entry = match archive.by_index_raw(index) {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!("跳过无法读取的压缩包条目 #{}: {}", index, err);
                    continue;
                }
            };

            let raw_name = entry.name().to_string();
            let Some(path) = normalize_path(&raw_name) else {
                tracing::warn!("跳过不安全的压缩包路径: {}", raw_name);
                continue;
            };
            if path.is_empty() {
                continue;
            }
            if path.split('/').next() == Some(MACOS_METADATA_DIR) {
                skipped_metadata += 1;
                continue;
            }

            entries.push(IndexedEntry {
                path,
                is_dir: entry.is_dir(),
                index,
                size: entry.size(),
                modified: entry.last_modified().and_then(zip_timestamp),
            });
        }

        if skipped_metadata > 0 {
            tracing::debug!("忽略了 {} 个 {} 条目", skipped_metadata, MACOS_METADATA_DIR);
        }

        entries
    }

    /// 建立目录索引，补齐压缩包里没有显式列出的父目录
    fn build_index(
        entries: Vec<IndexedEntry>,
    ) -> (HashMap<String, Vec<ChildEntry>>, HashMap<String, ArchiveFile>) {
        // 所有作为目录出现过的路径（显式目录条目和文件的祖先）
        let mut directory_paths: HashSet<String> = HashSet::new();
        for entry in &entries {
            if entry.is_dir {
                directory_paths.insert(entry.path.clone());
            }
            let mut current = parent_path(&entry.path);
            while let Some(dir) = current {
                if !directory_paths.insert(dir.to_string()) {
                    break;
                }
                current = parent_path(dir);
            }
        }

        let mut directories: HashMap<String, Vec<ChildEntry>> = HashMap::new();
        directories.insert(String::new(), Vec::new());
        let mut files = HashMap::new();

        for entry in entries {
            if entry.is_dir {
                register_directory(&mut directories, &entry.path);
                continue;
            }

            if directory_paths.contains(&entry.path) {
                tracing::warn!("压缩包中 {} 同时是文件和目录，忽略文件条目", entry.path);
                continue;
            }
            if files.contains_key(&entry.path) {
                tracing::warn!("压缩包中存在重复条目，忽略: {}", entry.path);
                continue;
            }

            let parent = parent_path(&entry.path).unwrap_or("");
            register_directory(&mut directories, parent);
            if let Some(children) = directories.get_mut(parent) {
                children.push(ChildEntry::file(base_name(&entry.path), entry.size));
            }
            files.insert(
                entry.path,
                ArchiveFile {
                    index: entry.index,
                    modified: entry.modified,
                },
            );
        }

        (directories, files)
    }

    /// 索引中的目录数量（含根目录）
    pub fn directory_count(&self) -> usize {
        self.directories.len()
    }

    /// 索引中的文件数量
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

/// zip 条目时间不带时区，按 UTC 解释
fn zip_timestamp(value: zip::DateTime) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(value.year().into(), value.month().into(), value.day().into())?
        .and_hms_opt(value.hour().into(), value.minute().into(), value.second().into())
        .map(|naive| naive.and_utc())
}

/// 登记目录并把它挂到父目录下，父目录不存在时递归补齐
fn register_directory(directories: &mut HashMap<String, Vec<ChildEntry>>, path: &str) {
    if directories.contains_key(path) {
        return;
    }
    directories.insert(path.to_string(), Vec::new());

    let parent = parent_path(path).unwrap_or("");
    register_directory(directories, parent);
    if let Some(children) = directories.get_mut(parent) {
        children.push(ChildEntry::directory(base_name(path)));
    }
}

impl<R: Read + Seek + Send> FileSource for ArchiveSource<R> {
    fn label(&self) -> &str {
        &self.label
    }

    fn list_children(&self, path: &str) -> Result<Vec<ChildEntry>, SourceError> {
        match self.directories.get(path) {
            Some(children) => Ok(children.clone()),
            None if self.files.contains_key(path) => Err(SourceError::NotADirectory(path.to_string())),
            None => Err(SourceError::EntryNotFound(path.to_string())),
        }
    }

    fn read_bytes(&self, path: &str) -> Result<Vec<u8>, SourceError> {
        let index = match self.files.get(path) {
            Some(file) => file.index,
            None if self.directories.contains_key(path) => {
                return Err(SourceError::NotAFile(path.to_string()))
            }
            None => return Err(SourceError::EntryNotFound(path.to_string())),
        };

        let mut archive = self.archive.lock().map_err(|_| SourceError::LockPoisoned)?;
        let mut entry = archive.by_index(index).map_err(|source| SourceError::Archive {
            path: path.to_string(),
            source,
        })?;

        let mut buffer = Vec::with_capacity(entry.size().min(1 << 20) as usize);
        entry.read_to_end(&mut buffer).map_err(|source| SourceError::Io {
            path: path.to_string(),
            source,
        })?;
        Ok(buffer)
    }

    fn modified(&self, path: &str) -> Option<DateTime<Utc>> {
        self.files.get(path).and_then(|file| file.modified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, content) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, options).unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_index_synthesizes_parent_directories() {
        let bytes = build_zip(&[
            ("app/package.json", "{}"),
            ("app/src/index.js", "console.log(1)"),
            ("README.md", "# root"),
        ]);
        let source = ArchiveSource::from_reader("demo", Cursor::new(bytes)).unwrap();

        let root = source.list_children("").unwrap();
        assert_eq!(
            root,
            vec![ChildEntry::directory("app"), ChildEntry::file("README.md", 6)]
        );

        let app = source.list_children("app").unwrap();
        assert_eq!(
            app,
            vec![ChildEntry::file("package.json", 2), ChildEntry::directory("src")]
        );

        assert_eq!(source.read_bytes("app/src/index.js").unwrap(), b"console.log(1)");
        assert_eq!(source.file_count(), 3);
        assert_eq!(source.directory_count(), 3);
    }

    #[test]
    fn test_explicit_directories_and_trailing_slash() {
        let bytes = build_zip(&[("docs/", ""), ("docs/guide/", ""), ("docs/guide/intro.md", "hi")]);
        let source = ArchiveSource::from_reader("docs", Cursor::new(bytes)).unwrap();

        assert_eq!(source.list_children("").unwrap(), vec![ChildEntry::directory("docs")]);
        assert_eq!(
            source.list_children("docs").unwrap(),
            vec![ChildEntry::directory("guide")]
        );
        assert!(matches!(
            source.list_children("docs/guide/intro.md"),
            Err(SourceError::NotADirectory(_))
        ));
        assert!(matches!(source.read_bytes("docs"), Err(SourceError::NotAFile(_))));
        assert!(matches!(
            source.list_children("nope"),
            Err(SourceError::EntryNotFound(_))
        ));
    }

    #[test]
    fn test_macos_metadata_is_ignored() {
        let bytes = build_zip(&[
            ("__MACOSX/app/._package.json", "junk"),
            ("app/package.json", "{}"),
        ]);
        let source = ArchiveSource::from_reader("mac", Cursor::new(bytes)).unwrap();

        assert_eq!(source.list_children("").unwrap(), vec![ChildEntry::directory("app")]);
    }

    #[test]
    fn test_entry_timestamps_are_kept() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let stamp = zip::DateTime::from_date_and_time(2023, 5, 1, 12, 30, 10).unwrap();
        let options = SimpleFileOptions::default().last_modified_time(stamp);
        writer.start_file("app/main.go", options).unwrap();
        writer.write_all(b"package main").unwrap();
        let bytes = writer.finish().unwrap().into_inner();
        let source = ArchiveSource::from_reader("stamped", Cursor::new(bytes)).unwrap();

        let expected = NaiveDate::from_ymd_opt(2023, 5, 1)
            .unwrap()
            .and_hms_opt(12, 30, 10)
            .unwrap()
            .and_utc();
        assert_eq!(source.modified("app/main.go"), Some(expected));
        assert_eq!(source.modified("app"), None);

        let files = source.walk_files("", &|_| false);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].modified, Some(expected));
    }

    #[test]
    fn test_empty_archive_has_empty_root() {
        let bytes = build_zip(&[]);
        let source = ArchiveSource::from_reader("empty", Cursor::new(bytes)).unwrap();

        assert!(source.list_children("").unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_archive_is_rejected() {
        let result = ArchiveSource::from_reader("bad", Cursor::new(b"PK\x03\x04 broken".to_vec()));
        assert!(matches!(result, Err(SourceError::InvalidArchive { .. })));
    }
}
