//! Content table schemas.

use folio_core::{Column, ColumnDefault, TableSchema};

const MAX_STRING: usize = 150;

pub static POSTS: TableSchema = TableSchema {
    name: "posts",
    columns: &[
        Column::increments("id"),
        Column::uuid("uuid").unique(),
        Column::string("title", MAX_STRING),
        Column::string("slug", MAX_STRING).unique(),
        Column::text("markdown").nullable(),
        Column::text("html").nullable(),
        Column::string("image", 2000).nullable(),
        Column::boolean("featured").default_to(ColumnDefault::Bool(false)),
        Column::boolean("page").default_to(ColumnDefault::Bool(false)),
        Column::string("status", MAX_STRING).default_to(ColumnDefault::Str("draft")),
        Column::string("language", 6).default_to(ColumnDefault::Str("en_US")),
        Column::string("meta_title", MAX_STRING).nullable(),
        Column::string("meta_description", 200).nullable(),
        Column::integer("author_id").nullable(),
        Column::date_time("created_at"),
        Column::uuid("created_by").nullable(),
        Column::date_time("updated_at").nullable(),
        Column::uuid("updated_by").nullable(),
        Column::date_time("published_at").nullable(),
        Column::uuid("published_by").nullable(),
    ],
};

pub static TAGS: TableSchema = TableSchema {
    name: "tags",
    columns: &[
        Column::increments("id"),
        Column::uuid("uuid").unique(),
        Column::string("name", MAX_STRING),
        Column::string("slug", MAX_STRING).unique(),
        Column::string("description", 200).nullable(),
        Column::integer("parent_id").nullable(),
        Column::date_time("created_at"),
        Column::uuid("created_by").nullable(),
        Column::date_time("updated_at").nullable(),
        Column::uuid("updated_by").nullable(),
    ],
};

/// Junction rows of the posts ↔ tags relation.
pub static POSTS_TAGS: TableSchema = TableSchema {
    name: "posts_tags",
    columns: &[
        Column::increments("id"),
        Column::integer("post_id"),
        Column::integer("tag_id"),
        Column::integer("sort_order").default_to(ColumnDefault::Int(0)),
    ],
};

pub static USERS: TableSchema = TableSchema {
    name: "users",
    columns: &[
        Column::increments("id"),
        Column::uuid("uuid").unique(),
        Column::string("name", MAX_STRING),
        Column::string("slug", MAX_STRING).unique(),
        Column::string("password", 255),
        Column::string("email", 254).unique(),
        Column::string("image", 2000).nullable(),
        Column::text("bio").nullable(),
        Column::string("website", 2000).nullable(),
        Column::string("location", MAX_STRING).nullable(),
        Column::string("status", MAX_STRING).default_to(ColumnDefault::Str("active")),
        Column::date_time("last_login_at").nullable(),
        Column::date_time("created_at"),
        Column::uuid("created_by").nullable(),
        Column::date_time("updated_at").nullable(),
        Column::uuid("updated_by").nullable(),
    ],
};

/// Session rows carry no audit columns.
pub static SESSIONS: TableSchema = TableSchema {
    name: "sessions",
    columns: &[
        Column::increments("id"),
        Column::uuid("uuid").unique(),
        Column::string("sid", 255).unique(),
        Column::text("sess"),
        Column::integer("expires"),
    ],
};

/// Every table, in creation order.
pub static ALL: [&TableSchema; 5] = [&POSTS, &TAGS, &POSTS_TAGS, &USERS, &SESSIONS];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugged_tables_declare_unique_slugs() {
        for table in [&POSTS, &TAGS, &USERS] {
            let slug = table.column("slug").unwrap();
            assert!(slug.unique, "{} slug must be unique", table.name);
        }
    }

    #[test]
    fn sessions_are_exempt_from_audit_columns() {
        assert!(!SESSIONS.permits("updated_by"));
        assert!(!SESSIONS.permits("created_at"));
        assert!(SESSIONS.permits("uuid"));
    }

    #[test]
    fn singular_names() {
        assert_eq!(POSTS.singular_name(), "post");
        assert_eq!(TAGS.singular_name(), "tag");
        assert_eq!(USERS.singular_name(), "user");
    }
}
