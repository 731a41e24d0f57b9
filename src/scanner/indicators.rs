use std::collections::HashMap;
use std::fmt;

use crate::models::IndicatorMatch;
use crate::source::ChildEntry;

/// 指标分档，仅用于展示，不参与计算
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IndicatorTier {
    /// 构建清单、版本控制根目录
    Strong,
    /// 容器化文件、README、CI 配置
    Medium,
    /// 许可证、lint/格式化配置
    Weak,
    /// 依赖缓存、构建产物目录
    Negative,
}

impl IndicatorTier {
    /// 根据权重推断分档
    pub fn from_weight(weight: i32) -> Self {
        match weight {
            w if w < 0 => IndicatorTier::Negative,
            w if w >= 50 => IndicatorTier::Strong,
            w if w >= 20 => IndicatorTier::Medium,
            _ => IndicatorTier::Weak,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorTier::Strong => "strong",
            IndicatorTier::Medium => "medium",
            IndicatorTier::Weak => "weak",
            IndicatorTier::Negative => "negative",
        }
    }
}

impl fmt::Display for IndicatorTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 强指标：构建清单和版本控制
const STRONG_INDICATORS: &[(&str, i32)] = &[
    (".git", 100),
    ("package.json", 80),
    ("pyproject.toml", 80),
    ("Cargo.toml", 80),
    ("go.mod", 80),
    ("pom.xml", 80),
    ("build.gradle", 80),
    ("build.gradle.kts", 80),
    ("Gemfile", 70),
    ("composer.json", 70),
    ("CMakeLists.txt", 70),
    ("Makefile", 60),
    ("tsconfig.json", 60),
    ("setup.py", 60),
    ("webpack.config.js", 50),
    ("vite.config.js", 50),
    ("rollup.config.js", 50),
    ("Pipfile", 50),
    ("poetry.lock", 50),
];

/// 中等指标：文档、容器化、CI
const MEDIUM_INDICATORS: &[(&str, i32)] = &[
    ("Dockerfile", 40),
    ("docker-compose.yml", 40),
    ("docker-compose.yaml", 40),
    ("setup.cfg", 40),
    ("requirements.txt", 35),
    ("README.md", 30),
    ("README.rst", 30),
    ("environment.yml", 30),
    ("README.txt", 25),
    (".env.example", 25),
    (".github", 25),
    ("README", 20),
    (".dockerignore", 20),
    (".travis.yml", 20),
    (".gitlab-ci.yml", 20),
    (".circleci", 20),
];

/// 弱指标：许可证和各类工具配置
const WEAK_INDICATORS: &[(&str, i32)] = &[
    (".gitignore", 15),
    (".editorconfig", 15),
    ("LICENSE", 15),
    ("LICENSE.txt", 15),
    ("LICENSE.md", 15),
    ("jest.config.js", 15),
    ("pytest.ini", 15),
    (".gitattributes", 10),
    (".prettierrc", 10),
    (".eslintrc", 10),
    (".eslintrc.js", 10),
    (".eslintrc.json", 10),
];

/// 负指标：依赖缓存和构建产物，说明这里不是项目根目录
const NEGATIVE_INDICATORS: &[(&str, i32)] = &[
    ("node_modules", -50),
    ("venv", -40),
    ("env", -40),
    (".venv", -40),
    ("virtualenv", -40),
    ("__pycache__", -30),
    ("target", -30),
    (".next", -30),
    ("build", -25),
    ("dist", -25),
    (".pytest_cache", -20),
    (".cache", -20),
    ("coverage", -20),
    (".coverage", -15),
];

/// 单个目录的打分结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryScore {
    /// 权重之和
    pub score: i32,

    /// 命中的指标（按名称排序）
    pub matches: Vec<IndicatorMatch>,

    /// 直接子项中是否有文件
    pub has_files: bool,
}

/// 启发式指标表：文件名或目录名 -> 权重
///
/// 名称精确匹配（区分大小写），不支持通配符。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorTable {
    /// 按登记顺序保存的条目
    entries: Vec<(String, i32)>,

    /// 名称 -> entries 下标
    lookup: HashMap<String, usize>,
}

impl Default for IndicatorTable {
    fn default() -> Self {
        let mut table = Self::empty();
        for tier in [
            STRONG_INDICATORS,
            MEDIUM_INDICATORS,
            WEAK_INDICATORS,
            NEGATIVE_INDICATORS,
        ] {
            for (name, weight) in tier {
                table.insert(*name, *weight);
            }
        }
        table
    }
}

impl IndicatorTable {
    /// 空表（测试或完全自定义时使用）
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            lookup: HashMap::new(),
        }
    }

    /// 链式添加指标
    pub fn with(mut self, name: impl Into<String>, weight: i32) -> Self {
        self.insert(name, weight);
        self
    }

    /// 添加或覆盖指标
    pub fn insert(&mut self, name: impl Into<String>, weight: i32) {
        let name = name.into();
        match self.lookup.get(&name) {
            Some(&index) => self.entries[index].1 = weight,
            None => {
                self.lookup.insert(name.clone(), self.entries.len());
                self.entries.push((name, weight));
            }
        }
    }

    /// 移除指标，返回原来的权重
    pub fn remove(&mut self, name: &str) -> Option<i32> {
        let index = self.lookup.remove(name)?;
        let (_, weight) = self.entries.remove(index);
        for slot in self.lookup.values_mut() {
            if *slot > index {
                *slot -= 1;
            }
        }
        Some(weight)
    }

    /// 查询名称对应的权重
    pub fn weight(&self, name: &str) -> Option<i32> {
        self.lookup.get(name).map(|&index| self.entries[index].1)
    }

    /// 按登记顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.entries.iter().map(|(name, weight)| (name.as_str(), *weight))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 只根据直接子项的名称给目录打分
    pub fn score(&self, children: &[ChildEntry]) -> DirectoryScore {
        let mut result = DirectoryScore::default();

        for child in children {
            if !child.is_dir {
                result.has_files = true;
            }
            if let Some(weight) = self.weight(&child.name) {
                result.score = result.score.saturating_add(weight);
                result.matches.push(IndicatorMatch::new(child.name.clone(), weight));
            }
        }

        result.matches.sort_by(|a, b| a.name.cmp(&b.name));
        result
    }
}
