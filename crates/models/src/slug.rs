//! Slug uniqueness resolution against storage.

use serde_json::Value;
use tracing::instrument;

use folio_core::slug::{SlugCandidates, normalize};
use folio_core::{Entity, ModelError, ModelResult, Record, TableSchema};
use folio_infra::{FetchOptions, Filter};

use crate::context::ModelContext;
use crate::repository::ReadOptions;

/// Resolve a unique slug for `entity` from free text.
///
/// Candidates are `base`, `base-2`, `base-3`, ... checked one by one against
/// storage (scoped by `options.status` when the table has a status column).
/// Gives up with [`ModelError::Duplicate`] after
/// [`crate::ModelSettings::slug_max_attempts`] candidates.
pub async fn generate_slug(
    ctx: &ModelContext,
    entity: &impl Entity,
    base: &str,
    options: &ReadOptions,
) -> ModelResult<String> {
    resolve_slug(ctx, entity, base, options, None).await
}

/// Candidate walk behind [`generate_slug`]. A row whose id is `own_id` does
/// not count as a collision.
#[instrument(skip_all, fields(table = entity.table().name), err)]
async fn resolve_slug(
    ctx: &ModelContext,
    entity: &impl Entity,
    base: &str,
    options: &ReadOptions,
    own_id: Option<i64>,
) -> ModelResult<String> {
    let table = entity.table();
    let mut candidates = SlugCandidates::new(normalize(base, table.singular_name()));
    let max_attempts = ctx.settings().slug_max_attempts;

    while candidates.attempt() <= max_attempts {
        let mut filter = Filter::new().eq("slug", candidates.current());
        if let Some(status) = options.status.as_deref().filter(|_| table.permits("status")) {
            filter = filter.eq("status", status);
        }

        let existing = ctx
            .store()
            .find_one(table, &filter, FetchOptions::default())
            .await?;
        let taken = existing.is_some_and(|row| {
            own_id.is_none() || row.get(TableSchema::PRIMARY_KEY).and_then(Value::as_i64) != own_id
        });
        if !taken {
            tracing::debug!(slug = candidates.current(), attempt = candidates.attempt(), "slug resolved");
            return Ok(candidates.into_inner());
        }
        candidates.advance();
    }

    Err(ModelError::duplicate(format!(
        "{}: no free slug for {:?} after {max_attempts} attempts",
        table.name, base
    )))
}

/// Pre-save slug handling shared by slugged models.
///
/// Resolves a slug when the record has none or when the caller changed it;
/// the base text is the proposed slug, else the `source` field. An unchanged
/// stored slug is kept as is, and the record's own row never counts as a
/// collision.
pub async fn ensure_slug(
    ctx: &ModelContext,
    entity: &impl Entity,
    record: &mut Record,
    source: &str,
    options: &ReadOptions,
) -> ModelResult<()> {
    if record.has("slug") && !record.has_changed("slug") {
        return Ok(());
    }
    let base = record
        .get_str("slug")
        .or_else(|| record.get_str(source))
        .unwrap_or_default()
        .to_string();
    let slug = resolve_slug(ctx, entity, &base, options, record.id()).await?;
    record.set("slug", slug);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use folio_core::attributes::Attributes;
    use folio_infra::{InMemoryStore, Store};
    use serde_json::json;

    use crate::context::ModelSettings;
    use crate::tables::POSTS;

    struct Posts;

    impl Entity for Posts {
        fn table(&self) -> &'static TableSchema {
            &POSTS
        }
    }

    async fn seed(store: &InMemoryStore, slug: &str, status: &str) {
        let row: Attributes = json!({ "slug": slug, "status": status })
            .as_object()
            .cloned()
            .unwrap();
        store.insert(&POSTS, &row).await.unwrap();
    }

    fn context(store: &Arc<InMemoryStore>) -> ModelContext {
        ModelContext::new(store.clone())
    }

    #[tokio::test]
    async fn free_text_becomes_a_slug() {
        let store = Arc::new(InMemoryStore::new());
        let slug = generate_slug(&context(&store), &Posts, "Hello World!", &ReadOptions::default())
            .await
            .unwrap();
        assert_eq!(slug, "hello-world");
    }

    #[tokio::test]
    async fn collisions_count_up_from_two() {
        let store = Arc::new(InMemoryStore::new());
        let ctx = context(&store);

        seed(&store, "hello-world", "draft").await;
        let second = generate_slug(&ctx, &Posts, "Hello World!", &ReadOptions::default())
            .await
            .unwrap();
        assert_eq!(second, "hello-world-2");

        seed(&store, "hello-world-2", "draft").await;
        let third = generate_slug(&ctx, &Posts, "Hello World!", &ReadOptions::default())
            .await
            .unwrap();
        assert_eq!(third, "hello-world-3");
    }

    #[tokio::test]
    async fn reserved_words_and_empty_text() {
        let store = Arc::new(InMemoryStore::new());
        let ctx = context(&store);
        let options = ReadOptions::default();

        assert_eq!(generate_slug(&ctx, &Posts, "admin", &options).await.unwrap(), "admin-post");
        assert_eq!(generate_slug(&ctx, &Posts, "!!!", &options).await.unwrap(), "post");
    }

    #[tokio::test]
    async fn status_scopes_the_lookup() {
        let store = Arc::new(InMemoryStore::new());
        let ctx = context(&store);
        seed(&store, "news", "published").await;

        let drafts = ReadOptions {
            status: Some("draft".into()),
            ..ReadOptions::default()
        };
        assert_eq!(generate_slug(&ctx, &Posts, "News", &drafts).await.unwrap(), "news");
        assert_eq!(
            generate_slug(&ctx, &Posts, "News", &ReadOptions::default()).await.unwrap(),
            "news-2"
        );
    }

    #[tokio::test]
    async fn search_is_bounded() {
        let store = Arc::new(InMemoryStore::new());
        seed(&store, "busy", "draft").await;
        seed(&store, "busy-2", "draft").await;
        let ctx = context(&store).with_settings(ModelSettings {
            slug_max_attempts: 2,
        });

        let err = generate_slug(&ctx, &Posts, "busy", &ReadOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::Duplicate(_)));
    }
}
