use chrono::{DateTime, Duration, Utc};
use hoxobil_store::{
    config::AppConfig,
    db::{create_orm_conn, pool_of, run_migrations},
    entity::site_events::SITE_LAUNCH,
    services::{
        auth_service::hash_password,
        competition_service::{create_profile, random_codes},
    },
};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

const DEFAULT_PRIZE: &str = "HOXOBIL hoodie";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;
    let pool = pool_of(&orm);

    let email = env_or("SEED_ADMIN_EMAIL", "admin@hoxobil.com");
    let password = env_or("SEED_ADMIN_PASSWORD", "admin12345");
    let admin_id = ensure_admin(&pool, &orm, &email, &password).await?;

    let launch_at = match std::env::var("SITE_LAUNCH_AT") {
        Ok(raw) => DateTime::parse_from_rfc3339(&raw)?.with_timezone(&Utc),
        Err(_) => Utc::now() + Duration::days(30),
    };
    ensure_launch_event(&pool, launch_at).await?;

    let count: usize = env_or("SEED_WINNING_CODES", "10").parse()?;
    let prize = env_or("SEED_PRIZE", DEFAULT_PRIZE);
    let added = seed_winning_codes(&pool, count, &prize).await?;

    println!("Seed completed. Admin ID: {admin_id}, launch at {launch_at}, {added} new winning codes");
    Ok(())
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

async fn ensure_admin(
    pool: &sqlx::PgPool,
    orm: &DatabaseConnection,
    email: &str,
    password: &str,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, first_name, role)
        VALUES ($1, $2, $3, 'Admin', 'admin')
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email.to_lowercase())
    .bind(password_hash)
    .fetch_one(pool)
    .await?;

    let has_profile: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM user_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
    if has_profile.is_none() {
        create_profile(orm, user_id, None).await?;
    }

    println!("Ensured admin {email}");
    Ok(user_id)
}

async fn ensure_launch_event(pool: &sqlx::PgPool, launch_at: DateTime<Utc>) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO site_events (id, event_name, event_datetime, is_active, notes)
        VALUES ($1, $2, $3, TRUE, 'Store opens to the public.')
        ON CONFLICT (event_name) DO UPDATE SET event_datetime = EXCLUDED.event_datetime,
            updated_at = now()
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(SITE_LAUNCH)
    .bind(launch_at)
    .execute(pool)
    .await?;

    println!("Ensured {SITE_LAUNCH} event");
    Ok(())
}

async fn seed_winning_codes(pool: &sqlx::PgPool, count: usize, prize: &str) -> anyhow::Result<u64> {
    let mut added = 0;
    for code in random_codes(count) {
        let result = sqlx::query(
            r#"
            INSERT INTO winning_codes (id, code, prize_description)
            VALUES ($1, $2, $3)
            ON CONFLICT (code) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(code)
        .bind(prize)
        .execute(pool)
        .await?;
        added += result.rows_affected();
    }
    Ok(added)
}
