use std::sync::Arc;

use api::accounts::{self, RegisterInput};
use api::notify::FcmProvider;
use api::Dispatcher;
use store::{PgStore, Role, Store};
use time::Duration;
use tokio::net::TcpListener;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;
use tracing::info;

use crate::extract::AppState;
use crate::routes;
use crate::settings::Settings;

/// Connect, run schema setup, bootstrap the admin account, and serve.
pub async fn serve(settings: Settings) -> anyhow::Result<()> {
    let store = PgStore::connect(&settings.database.url()).await?;
    store.init_schema().await?;
    bootstrap_admin(&store, &settings).await?;

    let session_store = PostgresStore::new(store.pool().clone());
    session_store.migrate().await?;
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_expiry(Expiry::OnInactivity(Duration::hours(settings.auth.ttl)));

    let dispatcher = Dispatcher::new(Arc::new(FcmProvider::new(
        settings.push.endpoint.clone(),
        settings.push.key.clone(),
    )));

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let state = AppState {
        store: Arc::new(store),
        dispatcher,
        settings: Arc::new(settings),
    };
    let app = routes::router(state).layer(session_layer);

    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Create the configured admin account unless that email is already taken.
/// Runs on every start; a restart never duplicates the account.
pub async fn bootstrap_admin(store: &dyn Store, settings: &Settings) -> anyhow::Result<()> {
    // Stored emails are lowercased at registration; match that here so a
    // mixed-case configured address still finds the existing account.
    let email = settings.admin.email.trim().to_lowercase();
    if store.user_by_email(&email).await?.is_some() {
        return Ok(());
    }
    let mut admin = accounts::register(
        store,
        RegisterInput {
            name: settings.admin.name.clone(),
            email,
            password: settings.admin.password.clone(),
        },
    )
    .await?;
    admin.role = Role::Admin;
    store.update_user(&admin).await?;
    info!(email = %admin.email, "bootstrap admin created");
    Ok(())
}

#[cfg(test)]
mod tests {
    use store::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn bootstrap_admin_is_created_once() {
        let store = MemoryStore::new();
        let settings = Settings::default();

        bootstrap_admin(&store, &settings).await.unwrap();
        bootstrap_admin(&store, &settings).await.unwrap();

        let admin = store
            .user_by_email(&settings.admin.email)
            .await
            .unwrap()
            .expect("admin exists");
        assert!(admin.is_admin());
        assert_eq!(store.all_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn bootstrap_admin_tolerates_mixed_case_configured_email() {
        let store = MemoryStore::new();
        let mut settings = Settings::default();
        settings.admin.email = "Admin@SkillMate.Local".into();

        bootstrap_admin(&store, &settings).await.unwrap();
        bootstrap_admin(&store, &settings).await.unwrap();

        let admin = store
            .user_by_email("admin@skillmate.local")
            .await
            .unwrap()
            .expect("admin exists");
        assert!(admin.is_admin());
        assert_eq!(store.all_users().await.unwrap().len(), 1);
    }
}
