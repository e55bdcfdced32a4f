//! Startup helpers: opening the configured store and seeding the first
//! admin account.

use std::time::Duration;

use chrono::Utc;
use opsdesk_core::config::{AuthConfig, DatabaseConfig};
use opsdesk_core::{DatabaseBackend, PasswordHasher};
use opsdesk_db::{DocumentStore, Filter, PostgresConfig, PostgresStore};
use opsdesk_types::{Role, User, UserId, UserRecord};
use tracing::{info, warn};

use crate::error::AppError;

/// Open the configured document store, running migrations when asked.
pub async fn open_store(config: &DatabaseConfig) -> Result<DocumentStore, AppError> {
    match config.backend {
        DatabaseBackend::Memory => {
            warn!("Using the in-memory store; data is lost on restart");
            Ok(DocumentStore::memory())
        }
        DatabaseBackend::Postgres => {
            let pg_config = PostgresConfig::new(&config.url)
                .with_max_connections(config.max_connections)
                .with_connect_timeout(Duration::from_secs(config.connect_timeout_secs));
            let store = PostgresStore::connect(&pg_config).await?;
            if config.run_migrations {
                store.run_migrations().await?;
            }
            Ok(DocumentStore::Postgres(store))
        }
    }
}

/// Create the bootstrap admin when both credentials are configured and
/// no user has that email yet.
///
/// Returns whether an account was created.
pub async fn seed_admin(
    store: &DocumentStore,
    auth: &AuthConfig,
    passwords: &PasswordHasher,
) -> Result<bool, AppError> {
    let (Some(email), Some(password)) = (&auth.admin_email, &auth.admin_password) else {
        return Ok(false);
    };
    let email = email.trim().to_lowercase();
    let users = store.collection::<UserRecord>();
    if users.exists(&Filter::new().eq("email", email.as_str())).await? {
        return Ok(false);
    }

    let now = Utc::now();
    let record = UserRecord {
        user: User {
            id: UserId::new(),
            name: auth.admin_name.clone(),
            email,
            role: Role::Admin,
            department: None,
            is_active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
        },
        password_hash: passwords.hash(password)?,
    };
    users.insert(&record).await?;
    info!(user_id = %record.user.id, email = %record.user.email, "Admin account created");
    Ok(true)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn auth_config() -> AuthConfig {
        AuthConfig {
            admin_email: Some(String::from(" Root@Opsdesk.Test ")),
            admin_password: Some(String::from("changeme")),
            hash_memory_kib: 1024,
            hash_iterations: 1,
            ..AuthConfig::default()
        }
    }

    #[tokio::test]
    async fn admin_is_seeded_once() {
        let store = DocumentStore::memory();
        let auth = auth_config();
        let passwords = PasswordHasher::from_config(&auth).unwrap();

        assert!(seed_admin(&store, &auth, &passwords).await.unwrap());
        assert!(!seed_admin(&store, &auth, &passwords).await.unwrap());

        let admin = store
            .collection::<UserRecord>()
            .find_one(Filter::new().eq("email", "root@opsdesk.test"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.user.role, Role::Admin);
        assert!(passwords.verify("changeme", &admin.password_hash).unwrap());
    }

    #[tokio::test]
    async fn no_credentials_means_no_admin() {
        let store = DocumentStore::memory();
        let auth = AuthConfig {
            admin_password: None,
            ..auth_config()
        };
        let passwords = PasswordHasher::from_config(&auth).unwrap();

        assert!(!seed_admin(&store, &auth, &passwords).await.unwrap());
    }

    #[tokio::test]
    async fn memory_backend_opens_without_a_url() {
        let store = open_store(&DatabaseConfig::default()).await.unwrap();
        assert_eq!(store.backend_name(), "memory");
    }
}
