//! Tag maintenance service.

use crate::repo::tag_repo::{normalize_tag, TagRepository, TagUsage};
use crate::repo::{RepoError, RepoResult};

pub struct TagService<R: TagRepository> {
    repo: R,
}

impl<R: TagRepository> TagService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn list_tags(&self) -> RepoResult<Vec<TagUsage>> {
        self.repo.list_tags()
    }

    /// Renames `from` to `to`, merging into `to` when it already exists.
    pub fn rename_tag(&self, from: &str, to: &str) -> RepoResult<String> {
        let source = normalize_tag(from).ok_or_else(|| RepoError::TagNotFound(from.to_string()))?;
        let target = normalize_tag(to)
            .ok_or_else(|| RepoError::InvalidData(format!("invalid tag name `{to}`")))?;
        if source != target {
            self.repo.rename_tag(&source, &target)?;
        }
        Ok(target)
    }

    pub fn delete_tag(&self, name: &str) -> RepoResult<()> {
        let normalized =
            normalize_tag(name).ok_or_else(|| RepoError::TagNotFound(name.to_string()))?;
        self.repo.delete_tag(&normalized)
    }
}
