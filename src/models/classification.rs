use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::DirectoryNode;

/// 分类过程的统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationStats {
    /// 访问过的目录数量
    pub directories: usize,

    /// 无法读取而被跳过内容的目录数量
    pub unreadable_directories: usize,

    /// 第一遍打分后暂定为项目的目录数量
    pub provisional_projects: usize,

    /// 因包含多个子项目而降级为容器的目录数量
    pub demoted_containers: usize,

    /// 被父目录吸收的子项目数量
    pub absorbed_projects: usize,

    /// 最终的项目数量
    pub projects: usize,
}

/// 项目边界分类结果：逻辑路径 -> 目录节点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// 使用的分数阈值
    pub threshold: i32,

    /// 所有访问过的目录
    pub nodes: BTreeMap<String, DirectoryNode>,

    /// 统计信息
    pub stats: ClassificationStats,
}

impl Classification {
    /// 空输入的结果
    pub fn empty(threshold: i32) -> Self {
        Self {
            threshold,
            nodes: BTreeMap::new(),
            stats: ClassificationStats::default(),
        }
    }

    pub fn get(&self, path: &str) -> Option<&DirectoryNode> {
        self.nodes.get(path)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 被判定为项目的节点（按路径排序）
    pub fn projects(&self) -> impl Iterator<Item = &DirectoryNode> {
        self.nodes.values().filter(|node| node.is_project)
    }

    /// 项目路径列表
    pub fn project_paths(&self) -> Vec<String> {
        self.projects().map(|node| node.path.clone()).collect()
    }

    pub fn project_count(&self) -> usize {
        self.projects().count()
    }

    /// 路径 -> 是否是项目
    pub fn project_flags(&self) -> BTreeMap<String, bool> {
        self.nodes
            .iter()
            .map(|(path, node)| (path.clone(), node.is_project))
            .collect()
    }

    /// 序列化为 JSON（键有序，相同输入得到相同输出）
    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_queries() {
        let mut classification = Classification::empty(50);
        for (path, is_project) in [("", false), ("api", true), ("web", true), ("docs", false)] {
            let mut node = DirectoryNode::new(path);
            node.is_project = is_project;
            classification.nodes.insert(path.to_string(), node);
        }

        assert_eq!(classification.len(), 4);
        assert_eq!(classification.project_count(), 2);
        assert_eq!(classification.project_paths(), vec!["api", "web"]);
        assert_eq!(classification.project_flags().get("docs"), Some(&false));
        assert!(classification.get("api").unwrap().is_project);
    }

    #[test]
    fn test_json_is_stable() {
        let mut classification = Classification::empty(75);
        classification.nodes.insert("b".into(), DirectoryNode::new("b"));
        classification.nodes.insert("a".into(), DirectoryNode::new("a"));

        let first = classification.to_json(false).unwrap();
        let second = classification.clone().to_json(false).unwrap();
        assert_eq!(first, second);
        assert!(first.find("\"a\"").unwrap() < first.find("\"b\"").unwrap());
    }
}
