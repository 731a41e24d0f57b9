use serde::{Deserialize, Serialize};
use std::fmt;

use crate::source::{base_name, path_depth};

/// 命中的指标及其权重
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorMatch {
    /// 文件名或目录名
    pub name: String,

    /// 权重（可为负）
    pub weight: i32,
}

impl IndicatorMatch {
    pub fn new(name: impl Into<String>, weight: i32) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }
}

impl fmt::Display for IndicatorMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:+})", self.name, self.weight)
    }
}

/// 遍历过程中每个目录对应的节点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryNode {
    /// 逻辑路径，根目录为空字符串
    pub path: String,

    /// 最终是否被判定为项目根目录
    pub is_project: bool,

    /// 直接子项命中的指标权重之和
    pub score: i32,

    /// 命中的指标
    pub indicators_found: Vec<IndicatorMatch>,

    /// 该目录之下（不含自身）被判定为项目的目录数量
    pub subproject_count: usize,

    /// 直接子项中是否有文件
    pub has_files: bool,
}

impl DirectoryNode {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_project: false,
            score: 0,
            indicators_found: Vec::new(),
            subproject_count: 0,
            has_files: false,
        }
    }

    /// 目录名，根目录为空字符串
    pub fn name(&self) -> &str {
        base_name(&self.path)
    }

    /// 深度，根目录为 0
    pub fn depth(&self) -> usize {
        path_depth(&self.path)
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// 指标的可读描述，例如 `package.json (+80), README.md (+30)`
    pub fn indicators_display(&self) -> String {
        self.indicators_found
            .iter()
            .map(|m| m.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
