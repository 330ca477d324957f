//! Wipe the database and load a small demo dataset.
//!
//! Destructive by design; intended for local development only.

use api::accounts::{self, ProfileUpdate, RegisterInput};
use api::swaps::{self, CreateSwap};
use api::{feedback, Dispatcher};
use api::notify::RecordingProvider;
use chrono::Utc;
use server::settings::Settings;
use std::sync::Arc;
use store::{GlobalNotice, PgStore, Priority, Role, Store, SwapStatus};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = Settings::new()?;
    let store = PgStore::connect(&settings.database.url()).await?;
    store.init_schema().await?;
    store.clear_all().await?;
    info!("database cleared");

    // Seeding never sends real pushes.
    let dispatcher = Dispatcher::new(Arc::new(RecordingProvider::new()));

    let mut admin = accounts::register(
        &store,
        RegisterInput {
            name: "Admin".into(),
            email: "admin@skillmate.local".into(),
            password: "admin-password".into(),
        },
    )
    .await?;
    admin.role = Role::Admin;
    store.update_user(&admin).await?;

    let alice = demo_user(
        &store,
        "Alice Chen",
        "alice@example.com",
        "San Francisco",
        &["Guitar", "Music Theory"],
        &["Spanish", "Cooking"],
    )
    .await?;
    let bob = demo_user(
        &store,
        "Bob Martinez",
        "bob@example.com",
        "Austin",
        &["Spanish", "Salsa Dancing"],
        &["Guitar"],
    )
    .await?;
    let carol = demo_user(
        &store,
        "Carol Okafor",
        "carol@example.com",
        "London",
        &["Cooking", "Photography"],
        &["Music Theory", "Photography Editing"],
    )
    .await?;

    let accepted = swaps::create(
        &store,
        &alice,
        CreateSwap {
            to_user: bob.id,
            offered_skill: "Guitar".into(),
            requested_skill: "Spanish".into(),
            message: Some("Happy to do weekly sessions".into()),
        },
    )
    .await?;
    let accepted = swaps::transition(&store, &dispatcher, accepted.id, &bob, SwapStatus::Accepted)
        .await?;
    swaps::create(
        &store,
        &carol,
        CreateSwap {
            to_user: alice.id,
            offered_skill: "Cooking".into(),
            requested_skill: "Music Theory".into(),
            message: None,
        },
    )
    .await?;

    feedback::submit(
        &store,
        &alice,
        api::feedback::SubmitFeedback {
            swap_id: accepted.id,
            rating: 5,
            comment: Some("Patient and well prepared".into()),
        },
    )
    .await?;

    store
        .insert_notice(GlobalNotice {
            id: Uuid::new_v4(),
            message: "Welcome to SkillMate! Fill in your profile to get matched.".into(),
            priority: Priority::Info,
            is_active: true,
            starts_at: None,
            ends_at: None,
            sent_by: admin.id,
            push_sent: false,
            push_sent_at: None,
            created_at: Utc::now(),
        })
        .await?;

    info!("seeded 4 users, 2 swaps, 1 feedback entry, 1 notice");
    Ok(())
}

async fn demo_user(
    store: &PgStore,
    name: &str,
    email: &str,
    location: &str,
    offered: &[&str],
    wanted: &[&str],
) -> anyhow::Result<store::User> {
    let user = accounts::register(
        store,
        RegisterInput {
            name: name.into(),
            email: email.into(),
            password: "demo-password".into(),
        },
    )
    .await?;
    let user = accounts::update_profile(
        store,
        &user,
        ProfileUpdate {
            location: Some(location.into()),
            skills_offered: Some(offered.iter().map(|s| s.to_string()).collect()),
            skills_wanted: Some(wanted.iter().map(|s| s.to_string()).collect()),
            availability: Some(vec!["weekends".into()]),
            profile_public: Some(true),
            ..Default::default()
        },
    )
    .await?;
    Ok(user)
}
