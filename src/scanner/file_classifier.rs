/// 文件类别
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileCategory {
    /// 代码文件及其语言
    Code(&'static str),
    /// 测试代码
    Test(&'static str),
    /// 文档
    Doc,
    /// 配置
    Config,
    /// 其他
    Other,
}

/// 语言 -> 扩展名（小写，不含点）
const CODE_EXTENSIONS: &[(&str, &[&str])] = &[
    ("python", &["py", "pyw"]),
    ("javascript", &["js", "mjs", "cjs"]),
    ("typescript", &["ts", "tsx"]),
    ("java", &["java"]),
    ("cpp", &["cpp", "cc", "cxx", "c", "h", "hpp"]),
    ("go", &["go"]),
    ("rust", &["rs"]),
    ("ruby", &["rb"]),
    ("php", &["php"]),
    ("swift", &["swift"]),
    ("kotlin", &["kt", "kts"]),
    ("scala", &["scala"]),
    ("csharp", &["cs"]),
    ("r", &["r"]),
    ("shell", &["sh", "bash", "zsh"]),
    ("html", &["html", "htm"]),
    ("css", &["css", "scss", "sass", "less"]),
    ("sql", &["sql"]),
];

const DOC_EXTENSIONS: &[&str] = &["md", "rst", "txt", "adoc", "tex", "markdown"];

const CONFIG_EXTENSIONS: &[&str] = &[
    "json", "yaml", "yml", "toml", "ini", "cfg", "conf", "xml", "env", "properties", "lock",
    "config",
];

/// 文件名中的测试模式
const TEST_NAME_PATTERNS: &[&str] = &[
    "test_", "_test.", "test.", ".test.", "spec.", ".spec.", "_spec.", "tests.", ".tests.",
];

/// 测试目录名
const TEST_DIRECTORIES: &[&str] = &["test", "tests", "__tests__", "spec", "specs"];

/// 小写扩展名，没有扩展名时返回 `None`
pub fn extension_of(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        // `.gitignore` 这类隐藏文件没有扩展名
        return None;
    }
    Some(ext.to_lowercase())
}

/// 根据扩展名判断语言
pub fn language_for_extension(ext: &str) -> Option<&'static str> {
    CODE_EXTENSIONS
        .iter()
        .find(|(_, exts)| exts.contains(&ext))
        .map(|(language, _)| *language)
}

/// 是否是测试文件（文件名模式或位于测试目录下）
///
/// `relative_path` 相对于项目根目录。
pub fn is_test_path(relative_path: &str) -> bool {
    let lower = relative_path.to_lowercase();
    let mut segments: Vec<&str> = lower.split('/').collect();
    let file_name = segments.pop().unwrap_or_default();

    TEST_NAME_PATTERNS.iter().any(|p| file_name.contains(p))
        || segments.iter().any(|dir| TEST_DIRECTORIES.contains(dir))
}

/// 对项目内的文件分类
pub fn classify_file(relative_path: &str) -> FileCategory {
    let file_name = relative_path.rsplit('/').next().unwrap_or(relative_path);
    let Some(ext) = extension_of(file_name) else {
        return FileCategory::Other;
    };

    if let Some(language) = language_for_extension(&ext) {
        return if is_test_path(relative_path) {
            FileCategory::Test(language)
        } else {
            FileCategory::Code(language)
        };
    }

    if DOC_EXTENSIONS.contains(&ext.as_str()) {
        FileCategory::Doc
    } else if CONFIG_EXTENSIONS.contains(&ext.as_str()) {
        FileCategory::Config
    } else {
        FileCategory::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("main.RS"), Some("rs".to_string()));
        assert_eq!(extension_of("archive.tar.gz"), Some("gz".to_string()));
        assert_eq!(extension_of(".gitignore"), None);
        assert_eq!(extension_of("Makefile"), None);
    }

    #[test]
    fn test_classify_code_and_tests() {
        assert_eq!(classify_file("src/app.py"), FileCategory::Code("python"));
        assert_eq!(classify_file("src/test_app.py"), FileCategory::Test("python"));
        assert_eq!(classify_file("tests/helpers.py"), FileCategory::Test("python"));
        assert_eq!(classify_file("web/Button.spec.tsx"), FileCategory::Test("typescript"));
        assert_eq!(classify_file("lib/util.h"), FileCategory::Code("cpp"));
        assert_eq!(classify_file("analysis.R"), FileCategory::Code("r"));
    }

    #[test]
    fn test_classify_docs_and_configs() {
        assert_eq!(classify_file("README.md"), FileCategory::Doc);
        assert_eq!(classify_file("docs/guide.rst"), FileCategory::Doc);
        assert_eq!(classify_file("package.json"), FileCategory::Config);
        assert_eq!(classify_file("Cargo.lock"), FileCategory::Config);
        assert_eq!(classify_file("logo.png"), FileCategory::Other);
        assert_eq!(classify_file("Dockerfile"), FileCategory::Other);
    }

    #[test]
    fn test_test_directory_only_counts_directories() {
        // 文件名本身叫 tests.md 不会让同级文件被当作测试
        assert!(!is_test_path("src/latest/app.py"));
        assert!(is_test_path("src/__tests__/app.js"));
    }
}
