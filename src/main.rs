use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use dotenv::dotenv;
use migration::{Migrator, MigratorTrait};
use solar_marketplace_backend::auth::jwks::JwksCache;
use solar_marketplace_backend::auth::jwt::TokenVerifier;
use solar_marketplace_backend::auth::middleware::IdentityGate;
use solar_marketplace_backend::config::{AppConfig, AuthConfig};
use solar_marketplace_backend::create_pool;
use solar_marketplace_backend::handlers;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = AppConfig::from_env().expect("Invalid configuration");

    let db = create_pool(&config.database_url, config.max_db_connections)
        .await
        .expect("Failed to connect to the database");
    if config.run_migrations {
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");
        tracing::info!("Migrations applied");
    }
    let db_data = web::Data::new(db);

    let verifier = match &config.auth {
        AuthConfig::Secret(secret) => TokenVerifier::Secret(secret.clone()),
        AuthConfig::Supabase {
            project_url,
            anon_key,
        } => {
            let jwks = JwksCache::for_supabase(project_url, anon_key, config.jwks_cache_ttl)
                .expect("Invalid SUPABASE_URL format. Expected: https://PROJECT.supabase.co");
            TokenVerifier::Jwks(Arc::new(jwks))
        }
    };
    let gate = web::Data::new(IdentityGate::new(verifier, config.role_cache_ttl));
    let engine_config = web::Data::new(config.engine.clone());

    let bind_addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Server running at http://{bind_addr}");

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST", "PUT", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
            ])
            .max_age(3600);

        App::new()
            .wrap(cors)
            .app_data(db_data.clone())
            .app_data(gate.clone())
            .app_data(engine_config.clone())
            .service(web::scope("/api").configure(handlers::init_routes))
    })
    .bind(&bind_addr)?
    .run()
    .await
}
