use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};

use crate::models::{Classification, ClassificationStats, DirectoryNode};
use crate::scanner::IndicatorTable;
use crate::source::{join_path, ChildEntry, FileSource, SourceError};

/// 默认分数阈值
pub const DEFAULT_THRESHOLD: i32 = 50;

/// 严格模式的分数阈值
pub const STRICT_THRESHOLD: i32 = 75;

/// 根节点在 arena 中的下标
const ROOT: usize = 0;

/// 分类器参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierOptions {
    /// 分数达到（含）该值的目录暂定为项目
    pub threshold: i32,

    /// 第一遍是否并行列出同一层的目录
    pub parallel: bool,
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            parallel: false,
        }
    }
}

impl ClassifierOptions {
    /// 严格模式
    pub fn strict() -> Self {
        Self {
            threshold: STRICT_THRESHOLD,
            ..Self::default()
        }
    }

    pub fn with_threshold(mut self, threshold: i32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// 节点 arena：按广度优先顺序追加，父节点下标总是小于子节点
struct NodeArena {
    nodes: Vec<DirectoryNode>,
    parents: Vec<Option<usize>>,
    index: HashMap<String, usize>,
    unreadable: usize,
}

impl NodeArena {
    fn with_root() -> Self {
        let mut arena = Self {
            nodes: Vec::new(),
            parents: Vec::new(),
            index: HashMap::new(),
            unreadable: 0,
        };
        arena.push(String::new(), None);
        arena
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn push(&mut self, path: String, parent: Option<usize>) -> usize {
        let id = self.nodes.len();
        self.index.insert(path.clone(), id);
        self.nodes.push(DirectoryNode::new(path));
        self.parents.push(parent);
        id
    }

    fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    fn into_nodes(self) -> BTreeMap<String, DirectoryNode> {
        self.nodes
            .into_iter()
            .map(|node| (node.path.clone(), node))
            .collect()
    }
}

/// 项目边界分类器
///
/// 三遍处理同一个节点表：
/// 1. 广度优先访问每个目录，只根据直接子项的名称打分，达到阈值的暂定为项目；
/// 2. 一次后序扫描统计每个节点之下的暂定项目数量；
/// 3. 包含两个及以上子项目的降级为容器，只包含一个的吸收该子项目。
pub struct ProjectClassifier {
    indicators: IndicatorTable,
    options: ClassifierOptions,
}

impl Default for ProjectClassifier {
    fn default() -> Self {
        Self::new(IndicatorTable::default(), ClassifierOptions::default())
    }
}

impl ProjectClassifier {
    pub fn new(indicators: IndicatorTable, options: ClassifierOptions) -> Self {
        Self { indicators, options }
    }

    pub fn threshold(&self) -> i32 {
        self.options.threshold
    }

    pub fn options(&self) -> &ClassifierOptions {
        &self.options
    }

    pub fn indicators(&self) -> &IndicatorTable {
        &self.indicators
    }

    /// 完整分类（三遍）
    ///
    /// 只有根目录无法读取时返回错误；其余目录的读取错误记录警告后跳过。
    pub fn classify(&self, source: &dyn FileSource) -> Result<Classification, SourceError> {
        let Some(mut arena) = self.score_pass(source)? else {
            tracing::info!("{} 为空，没有可分类的目录", source.label());
            return Ok(Classification::empty(self.options.threshold));
        };

        let sole_subprojects = Self::count_subprojects(&mut arena);
        let stats = Self::resolve_containment(&mut arena, &sole_subprojects);

        tracing::info!(
            "{}: 访问 {} 个目录，暂定项目 {} 个，降级 {} 个，吸收 {} 个，最终项目 {} 个",
            source.label(),
            stats.directories,
            stats.provisional_projects,
            stats.demoted_containers,
            stats.absorbed_projects,
            stats.projects
        );

        Ok(Classification {
            threshold: self.options.threshold,
            nodes: arena.into_nodes(),
            stats,
        })
    }

    /// 只执行第一遍打分，`is_project` 是暂定结果
    pub fn score_tree(&self, source: &dyn FileSource) -> Result<Classification, SourceError> {
        let Some(arena) = self.score_pass(source)? else {
            return Ok(Classification::empty(self.options.threshold));
        };

        let stats = ClassificationStats {
            directories: arena.len(),
            unreadable_directories: arena.unreadable,
            provisional_projects: arena.nodes.iter().filter(|n| n.is_project).count(),
            ..ClassificationStats::default()
        };

        Ok(Classification {
            threshold: self.options.threshold,
            nodes: arena.into_nodes(),
            stats,
        })
    }

    /// 第一遍：逐层访问目录并打分
    ///
    /// 根目录完全为空时返回 `None`。
    fn score_pass(&self, source: &dyn FileSource) -> Result<Option<NodeArena>, SourceError> {
        // 根目录读取失败属于输入错误，直接返回
        let root_children = source.list_children("")?;
        if root_children.is_empty() {
            return Ok(None);
        }

        let mut arena = NodeArena::with_root();
        let mut frontier = self.visit(&mut arena, ROOT, Ok(root_children));

        while !frontier.is_empty() {
            let listings = self.list_level(source, &frontier);

            let mut next = Vec::new();
            for (id, listing) in listings {
                next.extend(self.visit(&mut arena, id, listing));
            }
            frontier = next;
        }

        Ok(Some(arena))
    }

    /// 列出同一层所有目录的子项，并行时结果顺序与 frontier 一致
    fn list_level(
        &self,
        source: &dyn FileSource,
        frontier: &[(usize, String)],
    ) -> Vec<(usize, Result<Vec<ChildEntry>, SourceError>)> {
        if self.options.parallel {
            frontier
                .par_iter()
                .map(|(id, path)| (*id, source.list_children(path)))
                .collect()
        } else {
            frontier
                .iter()
                .map(|(id, path)| (*id, source.list_children(path)))
                .collect()
        }
    }

    /// 给单个目录打分，返回需要继续访问的子目录
    fn visit(
        &self,
        arena: &mut NodeArena,
        id: usize,
        listing: Result<Vec<ChildEntry>, SourceError>,
    ) -> Vec<(usize, String)> {
        let children = match listing {
            Ok(children) => children,
            Err(err) => {
                tracing::warn!("跳过无法读取的目录 {:?}: {}", arena.nodes[id].path, err);
                arena.unreadable += 1;
                return Vec::new();
            }
        };

        let scored = self.indicators.score(&children);
        let path = arena.nodes[id].path.clone();
        {
            let node = &mut arena.nodes[id];
            node.score = scored.score;
            node.indicators_found = scored.matches;
            node.has_files = scored.has_files;
            // 空目录只记录，不判定为项目
            node.is_project = !children.is_empty() && scored.score >= self.options.threshold;
        }

        let mut pending = Vec::new();
        for child in children.into_iter().filter(|c| c.is_dir) {
            let child_path = join_path(&path, &child.name);
            if arena.contains(&child_path) {
                tracing::warn!("目录 {:?} 已访问过，跳过", child_path);
                continue;
            }
            let child_id = arena.push(child_path.clone(), Some(id));
            pending.push((child_id, child_path));
        }
        pending
    }

    /// 第二遍：后序统计每个节点之下的暂定项目数量
    ///
    /// 返回每个节点之下遇到的第一个暂定项目，子项目数量为 1 时即为唯一的子项目。
    fn count_subprojects(arena: &mut NodeArena) -> Vec<Option<usize>> {
        let len = arena.len();
        let mut below = vec![0usize; len];
        let mut first_below: Vec<Option<usize>> = vec![None; len];

        // 子节点下标总是大于父节点，倒序即后序
        for id in (0..len).rev() {
            let Some(parent) = arena.parents[id] else {
                continue;
            };
            let is_project = arena.nodes[id].is_project;

            below[parent] += below[id] + usize::from(is_project);
            if first_below[parent].is_none() {
                first_below[parent] = if is_project { Some(id) } else { first_below[id] };
            }
        }

        for (node, count) in arena.nodes.iter_mut().zip(below) {
            node.subproject_count = count;
        }

        first_below
    }

    /// 第三遍：处理包含关系
    ///
    /// 判断依据是第一遍的暂定结果和第二遍的计数，处理顺序不影响结果。
    fn resolve_containment(
        arena: &mut NodeArena,
        sole_subprojects: &[Option<usize>],
    ) -> ClassificationStats {
        let provisional: Vec<bool> = arena.nodes.iter().map(|n| n.is_project).collect();
        let mut stats = ClassificationStats {
            directories: arena.len(),
            unreadable_directories: arena.unreadable,
            provisional_projects: provisional.iter().filter(|p| **p).count(),
            ..ClassificationStats::default()
        };

        for id in 0..arena.len() {
            // 根目录即使分数不够，也可以吸收唯一的子项目
            if !provisional[id] && id != ROOT {
                continue;
            }

            match arena.nodes[id].subproject_count {
                0 => {}
                1 => {
                    if let Some(child) = sole_subprojects[id] {
                        tracing::debug!(
                            "{:?} 吸收唯一的子项目 {:?}",
                            arena.nodes[id].path,
                            arena.nodes[child].path
                        );
                        arena.nodes[child].is_project = false;
                        arena.nodes[id].is_project = true;
                        stats.absorbed_projects += 1;
                    }
                }
                count => {
                    if arena.nodes[id].is_project {
                        tracing::debug!(
                            "{:?} 包含 {} 个子项目，降级为容器",
                            arena.nodes[id].path,
                            count
                        );
                        stats.demoted_containers += 1;
                    }
                    arena.nodes[id].is_project = false;
                }
            }
        }

        stats.projects = arena.nodes.iter().filter(|n| n.is_project).count();
        stats
    }
}
