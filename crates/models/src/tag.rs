use async_trait::async_trait;

use folio_core::{Entity, ModelResult, Record, SaveContext, TableSchema};

use crate::context::ModelContext;
use crate::model::{Model, RelationDef};
use crate::repository::ReadOptions;
use crate::slug::ensure_slug;
use crate::tables::{POSTS, POSTS_TAGS, TAGS};

static RELATIONS: [RelationDef; 2] = [
    RelationDef::belongs_to("parent", &TAGS, "parent_id"),
    RelationDef::belongs_to_many("posts", &POSTS, &POSTS_TAGS, "tag_id", "post_id"),
];

#[derive(Debug, Copy, Clone, Default)]
pub struct Tag;

impl Entity for Tag {
    fn table(&self) -> &'static TableSchema {
        &TAGS
    }
}

#[async_trait]
impl Model for Tag {
    fn relations(&self) -> &'static [RelationDef] {
        &RELATIONS
    }

    async fn before_save(
        &self,
        ctx: &ModelContext,
        record: &mut Record,
        _save: &SaveContext,
    ) -> ModelResult<()> {
        ensure_slug(ctx, self, record, "name", &ReadOptions::default()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use folio_core::AuditContext;
    use folio_infra::InMemoryStore;
    use serde_json::json;

    use crate::lifecycle::SaveOptions;
    use crate::repository::Repository;

    async fn add(tags: &Repository<Tag>, value: serde_json::Value) -> Record {
        tags.add(
            value.as_object().cloned().unwrap(),
            AuditContext::anonymous(),
            SaveOptions::default(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn parent_tag_loads_as_single_relation() {
        let ctx = ModelContext::new(Arc::new(InMemoryStore::new()));
        let tags = Repository::new(ctx, Tag);

        let parent = add(&tags, json!({ "name": "Languages" })).await;
        let child = add(&tags, json!({ "name": "Crème Brûlée", "parent_id": parent.id() })).await;
        assert_eq!(child.get_str("slug"), Some("creme-brulee"));

        let loaded = tags
            .read(
                folio_infra::Filter::by_id(child.id().unwrap()),
                &ReadOptions::required().with_related(&["parent"]),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.to_json(false)["parent"]["slug"], json!("languages"));
    }

    #[tokio::test]
    async fn tag_named_tag_gets_suffixed() {
        let ctx = ModelContext::new(Arc::new(InMemoryStore::new()));
        let tags = Repository::new(ctx, Tag);
        let tag = add(&tags, json!({ "name": "Tag" })).await;
        assert_eq!(tag.get_str("slug"), Some("tag-tag"));
    }
}
