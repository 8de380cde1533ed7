//! Tag repository and tag normalization rules.
//!
//! # Invariants
//! - Tag names are trimmed, lowercased and deduplicated before persistence.
//! - Tag rows without task links are kept until explicitly deleted.

use crate::repo::{ensure_tables, write_atomically, RepoError, RepoResult};
use rusqlite::{params, Connection};
use std::collections::BTreeSet;

/// Tag name with the number of tasks carrying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagUsage {
    pub name: String,
    pub task_count: u32,
}

pub trait TagRepository {
    /// Lists all tags sorted by name.
    fn list_tags(&self) -> RepoResult<Vec<TagUsage>>;
    /// Renames a tag; merges into `to` when it already exists.
    fn rename_tag(&self, from: &str, to: &str) -> RepoResult<()>;
    fn delete_tag(&self, name: &str) -> RepoResult<()>;
}

pub struct SqliteTagRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTagRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["tags", "task_tags"])?;
        Ok(Self { conn })
    }
}

impl TagRepository for SqliteTagRepository<'_> {
    fn list_tags(&self) -> RepoResult<Vec<TagUsage>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.name, COUNT(tt.task_uuid) AS task_count
             FROM tags t
             LEFT JOIN task_tags tt ON tt.tag_id = t.id
             GROUP BY t.id
             ORDER BY t.name COLLATE NOCASE ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            let name: String = row.get("name")?;
            tags.push(TagUsage {
                name: name.to_lowercase(),
                task_count: row.get("task_count")?,
            });
        }
        Ok(tags)
    }

    fn rename_tag(&self, from: &str, to: &str) -> RepoResult<()> {
        write_atomically(self.conn, |conn| {
            let source_id = tag_id(conn, from)?.ok_or_else(|| tag_not_found(from))?;

            conn.execute("INSERT OR IGNORE INTO tags (name) VALUES (?1);", [to])?;
            let target_id = tag_id(conn, to)?.ok_or_else(|| tag_not_found(to))?;
            if target_id != source_id {
                conn.execute(
                    "INSERT OR IGNORE INTO task_tags (task_uuid, tag_id)
                     SELECT task_uuid, ?2 FROM task_tags WHERE tag_id = ?1;",
                    params![source_id, target_id],
                )?;
                conn.execute("DELETE FROM tags WHERE id = ?1;", [source_id])?;
            }
            Ok(())
        })
    }

    fn delete_tag(&self, name: &str) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tags WHERE name = ?1 COLLATE NOCASE;", [name])?;
        if changed == 0 {
            return Err(tag_not_found(name));
        }
        Ok(())
    }
}

/// Normalizes one tag value. Returns `None` for blank input.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim().trim_start_matches('#').trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Normalizes, sorts and deduplicates tag values.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .filter_map(|tag| normalize_tag(tag))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn tag_id(conn: &Connection, name: &str) -> RepoResult<Option<i64>> {
    let mut stmt = conn.prepare("SELECT id FROM tags WHERE name = ?1 COLLATE NOCASE;")?;
    let mut rows = stmt.query([name])?;
    match rows.next()? {
        Some(row) => Ok(Some(row.get(0)?)),
        None => Ok(None),
    }
}

fn tag_not_found(name: &str) -> RepoError {
    RepoError::TagNotFound(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::{normalize_tag, normalize_tags};

    #[test]
    fn normalize_tag_strips_hash_and_case() {
        assert_eq!(normalize_tag(" #Work "), Some("work".to_string()));
        assert_eq!(normalize_tag("  "), None);
        assert_eq!(normalize_tag("#"), None);
    }

    #[test]
    fn normalize_tags_deduplicates() {
        let tags = vec!["Home".to_string(), "home".to_string(), "errands".to_string()];
        assert_eq!(normalize_tags(&tags), vec!["errands", "home"]);
    }
}
