use hoxobil_store::{
    config::AppConfig,
    db::{create_orm_conn, pool_of, run_migrations},
    session::migrate_store,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;
    migrate_store(&pool_of(&orm)).await?;
    println!("Migrations applied");
    Ok(())
}
