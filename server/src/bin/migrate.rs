//! Apply the schema and normalize legacy skill data.
//!
//! Early records stored comma-joined strings as single list entries
//! ("Guitar, Piano" as one skill). This pass re-splits every user's lists
//! into canonical one-term entries and is safe to run repeatedly.

use server::settings::Settings;
use store::models::normalize_terms;
use store::{PgStore, Store};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = Settings::new()?;
    let store = PgStore::connect(&settings.database.url()).await?;
    store.init_schema().await?;
    info!("schema applied");

    let mut fixed = 0u64;
    for user in store.all_users().await? {
        let offered = normalize_terms(user.skills_offered.iter());
        let wanted = normalize_terms(user.skills_wanted.iter());
        let availability = normalize_terms(user.availability.iter());
        if offered != user.skills_offered
            || wanted != user.skills_wanted
            || availability != user.availability
        {
            let mut user = user;
            user.skills_offered = offered;
            user.skills_wanted = wanted;
            user.availability = availability;
            store.update_user(&user).await?;
            fixed += 1;
        }
    }
    info!(fixed, "legacy skill lists normalized");
    Ok(())
}
