//! User model and the credential service.
//!
//! The `User` model hashes a new or changed password in its pre-save hook, so
//! no save path persists plaintext. `add_user` checks the email is free before
//! anything is hashed. `check_credentials` is read-only: one lookup, one
//! verification, no write.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;

use folio_core::attributes::Attributes;
use folio_core::{AuditContext, Entity, ModelError, ModelResult, Record, SaveContext, TableSchema};
use folio_infra::{ConfigError, Filter};
use folio_models::slug::ensure_slug;
use folio_models::tables::{POSTS, USERS};
use folio_models::{Model, ModelContext, ReadOptions, RelationDef, Repository, SaveOptions};

use crate::password::{Argon2Hasher, HashingConfig, SecretHasher, is_phc_hash};

// ─────────────────────────────────────────────────────────────────────────────
// User model
// ─────────────────────────────────────────────────────────────────────────────

static RELATIONS: [RelationDef; 1] = [RelationDef::has_many("posts", &POSTS, "author_id")];

#[derive(Clone)]
pub struct User {
    hasher: Arc<dyn SecretHasher>,
}

impl User {
    pub fn new(hasher: Arc<dyn SecretHasher>) -> Self {
        Self { hasher }
    }

    /// Replace a new or changed plaintext password with its hash.
    ///
    /// Imports may carry an existing PHC hash, which is stored as is.
    async fn hash_password(&self, record: &mut Record, save: &SaveContext) -> ModelResult<()> {
        if !record.has_changed("password") {
            return Ok(());
        }
        let Some(password) = record.get_str("password").map(str::to_owned) else {
            return Ok(());
        };
        if password.is_empty() {
            return Err(ModelError::validation("users: password is required"));
        }
        if save.is_importing() && is_phc_hash(&password) {
            return Ok(());
        }

        let hasher = Arc::clone(&self.hasher);
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(join_error)??;
        record.set("password", hash);
        Ok(())
    }
}

impl Entity for User {
    fn table(&self) -> &'static TableSchema {
        &USERS
    }
}

#[async_trait]
impl Model for User {
    fn relations(&self) -> &'static [RelationDef] {
        &RELATIONS
    }

    async fn before_save(
        &self,
        ctx: &ModelContext,
        record: &mut Record,
        save: &SaveContext,
    ) -> ModelResult<()> {
        self.hash_password(record, save).await?;
        ensure_slug(ctx, self, record, "name", &ReadOptions::default()).await
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User").finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Credential service
// ─────────────────────────────────────────────────────────────────────────────

/// Trimmed, lowercased email of a candidate.
fn normalize_email(value: Option<&Value>) -> ModelResult<String> {
    let email = value
        .and_then(Value::as_str)
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ModelError::validation("users: email is required"))?;
    if !email.contains('@') {
        return Err(ModelError::validation("users: email is not a valid address"));
    }
    Ok(email)
}

fn join_error(e: tokio::task::JoinError) -> ModelError {
    ModelError::storage(format!("hashing task failed: {e}"))
}

/// User registration and authentication.
#[derive(Debug, Clone)]
pub struct Users {
    repo: Repository<User>,
}

impl Users {
    /// Service with the Argon2 hasher configured from the environment.
    pub fn from_env(ctx: ModelContext) -> Result<Self, ConfigError> {
        let hasher = Argon2Hasher::new(HashingConfig::from_env()?)?;
        Ok(Self::with_hasher(ctx, Arc::new(hasher)))
    }

    pub fn with_hasher(ctx: ModelContext, hasher: Arc<dyn SecretHasher>) -> Self {
        Self {
            repo: Repository::new(ctx, User::new(hasher)),
        }
    }

    pub fn repository(&self) -> &Repository<User> {
        &self.repo
    }

    /// Register a user. The plaintext password never reaches storage.
    #[instrument(skip_all, err)]
    pub async fn add_user(&self, mut candidate: Attributes, audit: AuditContext) -> ModelResult<Record> {
        let email = normalize_email(candidate.get("email"))?;
        if !candidate
            .get("password")
            .and_then(Value::as_str)
            .is_some_and(|p| !p.is_empty())
        {
            return Err(ModelError::validation("users: password is required"));
        }

        let existing = self
            .repo
            .read(Filter::new().eq("email", email.as_str()), &ReadOptions::default())
            .await?;
        if existing.is_some() {
            return Err(ModelError::duplicate(format!(
                "a user with email {email} already exists"
            )));
        }

        candidate.insert("email".into(), Value::from(email));
        let user = self.repo.add(candidate, audit, SaveOptions::default()).await?;
        tracing::info!(user_id = user.id(), "user added");
        Ok(user)
    }

    /// Authenticate by email and secret, returning the user on a match.
    #[instrument(skip_all, err)]
    pub async fn check_credentials(&self, email: &str, secret: &str) -> ModelResult<Record> {
        let email = email.trim().to_lowercase();
        let user = self
            .repo
            .read(Filter::new().eq("email", email), &ReadOptions::required())
            .await?
            .ok_or(ModelError::NotFound)?;

        let Some(hash) = user.get_str("password").map(str::to_owned) else {
            return Err(ModelError::Authentication);
        };
        let hasher = Arc::clone(&self.repo.model().hasher);
        let secret = secret.to_owned();
        let matched = tokio::task::spawn_blocking(move || hasher.verify(&secret, &hash))
            .await
            .map_err(join_error)??;

        if !matched {
            tracing::debug!(user_id = user.id(), "credential mismatch");
            return Err(ModelError::Authentication);
        }
        Ok(user)
    }

    /// Projection of `user` without the password hash.
    pub fn public_json(user: &Record) -> Value {
        let mut json = user.to_json(false);
        if let Value::Object(fields) = &mut json {
            fields.remove("password");
        }
        json
    }
}
