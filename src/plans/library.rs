use anyhow::Result;
use log::info;

use crate::{
    auth::UserContext,
    db::{
        models::{ExerciseLibraryItem, LibraryItemDraft},
        Database,
    },
};

/// Shared exercise catalogue. Anyone can browse; only admins edit.
#[derive(Clone)]
pub struct ExerciseLibrary {
    db: Database,
}

impl ExerciseLibrary {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn search(&self, query: Option<&str>) -> Result<Vec<ExerciseLibraryItem>> {
        self.db.list_library_items(query.map(str::to_string)).await
    }

    pub async fn get(&self, item_id: &str) -> Result<Option<ExerciseLibraryItem>> {
        self.db.get_library_item(item_id).await
    }

    pub async fn create(
        &self,
        ctx: &UserContext,
        draft: LibraryItemDraft,
    ) -> Result<ExerciseLibraryItem> {
        ctx.require_admin()?;
        let item = self.db.insert_library_item(draft).await?;
        info!("{} added library exercise {}", ctx.user_id, item.name);
        Ok(item)
    }

    pub async fn update(
        &self,
        ctx: &UserContext,
        item_id: &str,
        draft: LibraryItemDraft,
    ) -> Result<ExerciseLibraryItem> {
        ctx.require_admin()?;
        self.db.update_library_item(item_id, draft).await
    }

    pub async fn delete(&self, ctx: &UserContext, item_id: &str) -> Result<()> {
        ctx.require_admin()?;
        self.db.delete_library_item(item_id).await?;
        info!("{} removed library exercise {item_id}", ctx.user_id);
        Ok(())
    }
}
