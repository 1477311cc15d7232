//! Posts and pages.

use async_trait::async_trait;

use folio_core::attributes::canonical_date;
use folio_core::{Entity, ModelResult, Record, SaveContext, TableSchema};

use crate::context::ModelContext;
use crate::model::{Model, RelationDef};
use crate::repository::ReadOptions;
use crate::slug::ensure_slug;
use crate::tables::{POSTS, POSTS_TAGS, TAGS, USERS};

pub const STATUS_PUBLISHED: &str = "published";

static RELATIONS: [RelationDef; 2] = [
    RelationDef::belongs_to("author", &USERS, "author_id"),
    RelationDef::belongs_to_many("tags", &TAGS, &POSTS_TAGS, "post_id", "tag_id"),
];

#[derive(Debug, Copy, Clone, Default)]
pub struct Post;

impl Entity for Post {
    fn table(&self) -> &'static TableSchema {
        &POSTS
    }
}

#[async_trait]
impl Model for Post {
    fn relations(&self) -> &'static [RelationDef] {
        &RELATIONS
    }

    async fn before_save(
        &self,
        ctx: &ModelContext,
        record: &mut Record,
        save: &SaveContext,
    ) -> ModelResult<()> {
        ensure_slug(ctx, self, record, "title", &ReadOptions::default()).await?;

        // First publication records when and by whom.
        if record.get_str("status") == Some(STATUS_PUBLISHED)
            && record.has_changed("status")
            && !record.has("published_at")
        {
            record.set("published_at", canonical_date(save.now));
            record.set("published_by", save.principal_value());
        }
        Ok(())
    }
}
