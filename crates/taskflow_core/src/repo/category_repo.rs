//! Category repository contracts and SQLite implementation.

use crate::model::category::{Category, CategoryId};
use crate::repo::{ensure_tables, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection};

pub trait CategoryRepository {
    fn create_category(&self, category: &Category) -> RepoResult<CategoryId>;
    fn update_category(&self, category: &Category) -> RepoResult<()>;
    fn list_categories(&self) -> RepoResult<Vec<Category>>;
    /// Deletes the category; tasks keep living with `category_uuid = NULL`.
    fn delete_category(&self, id: CategoryId) -> RepoResult<()>;
}

pub struct SqliteCategoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCategoryRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["categories"])?;
        Ok(Self { conn })
    }
}

impl CategoryRepository for SqliteCategoryRepository<'_> {
    fn create_category(&self, category: &Category) -> RepoResult<CategoryId> {
        self.conn.execute(
            "INSERT INTO categories (uuid, name, color, icon) VALUES (?1, ?2, ?3, ?4);",
            params![
                category.id.to_string(),
                category.name.as_str(),
                category.color.as_deref(),
                category.icon.as_deref(),
            ],
        )?;
        Ok(category.id)
    }

    fn update_category(&self, category: &Category) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE categories SET name = ?2, color = ?3, icon = ?4 WHERE uuid = ?1;",
            params![
                category.id.to_string(),
                category.name.as_str(),
                category.color.as_deref(),
                category.icon.as_deref(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "category",
                id: category.id,
            });
        }
        Ok(())
    }

    fn list_categories(&self) -> RepoResult<Vec<Category>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, name, color, icon
             FROM categories
             ORDER BY name COLLATE NOCASE ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut categories = Vec::new();
        while let Some(row) = rows.next()? {
            let uuid_text: String = row.get("uuid")?;
            categories.push(Category {
                id: parse_uuid(&uuid_text, "categories.uuid")?,
                name: row.get("name")?,
                color: row.get("color")?,
                icon: row.get("icon")?,
            });
        }
        Ok(categories)
    }

    fn delete_category(&self, id: CategoryId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM categories WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "category",
                id,
            });
        }
        Ok(())
    }
}
