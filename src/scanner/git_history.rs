use anyhow::Result;
use chrono::{DateTime, Utc};
use git2::Repository;
use std::path::Path;

/// 仓库的提交统计
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitStats {
    /// HEAD 可达的提交数量
    pub total_commits: usize,

    /// HEAD 指向的提交时间
    pub last_commit_date: Option<DateTime<Utc>>,
}

/// Git 历史分析器
#[derive(Debug, Clone, Copy, Default)]
pub struct GitHistory;

impl GitHistory {
    pub fn new() -> Self {
        Self
    }

    /// 读取项目根目录下仓库的提交统计
    ///
    /// 只打开 `repo_path` 本身的仓库，不向上查找；不是仓库时返回 `None`。
    pub fn commit_stats(&self, repo_path: &Path) -> Result<Option<CommitStats>> {
        let repo = match Repository::open(repo_path) {
            Ok(repo) => repo,
            Err(_) => return Ok(None),
        };

        // 还没有提交的新仓库
        let head = match repo.head() {
            Ok(head) => head,
            Err(_) => {
                return Ok(Some(CommitStats {
                    total_commits: 0,
                    last_commit_date: None,
                }))
            }
        };

        let last_commit = head.peel_to_commit()?;
        let last_commit_date = DateTime::from_timestamp(last_commit.time().seconds(), 0);

        let mut revwalk = repo.revwalk()?;
        revwalk.push_head()?;
        let mut total_commits = 0;
        for oid in revwalk {
            oid?;
            total_commits += 1;
        }

        tracing::debug!("{}: {} 次提交", repo_path.display(), total_commits);

        Ok(Some(CommitStats {
            total_commits,
            last_commit_date,
        }))
    }
}
