use std::collections::BTreeSet;

use crate::scanner::{DEFAULT_IGNORE_DIRS, DEFAULT_MAX_FILE_SIZE, DEFAULT_MAX_MANIFEST_SIZE};

pub struct DefaultConfig;

impl DefaultConfig {
    /// 提取元数据时默认忽略的目录名
    pub fn default_ignore_dirs() -> BTreeSet<String> {
        let mut dirs: BTreeSet<String> = DEFAULT_IGNORE_DIRS.iter().map(|d| d.to_string()).collect();

        // 常见的测试和工具缓存
        dirs.insert(".gradle".to_string());
        dirs.insert(".terraform".to_string());

        dirs
    }

    /// 单文件大小上限（20 MiB）
    pub fn default_max_file_size() -> u64 {
        DEFAULT_MAX_FILE_SIZE
    }

    pub fn default_max_manifest_size() -> u64 {
        DEFAULT_MAX_MANIFEST_SIZE
    }

    /// 分类超时（秒）
    pub fn default_timeout_secs() -> u64 {
        300
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ignore_dirs() {
        let dirs = DefaultConfig::default_ignore_dirs();
        assert!(dirs.contains("node_modules"));
        assert!(dirs.contains(".git"));
        assert!(dirs.contains(".gradle"));
        assert!(!dirs.contains("src"));
    }
}
