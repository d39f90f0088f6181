use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use std::env;

use waveform_backend::analysis::Analyzer;
use waveform_backend::auth::jwt::JwtService;
use waveform_backend::config::{AnalysisSettings, ServerConfig};
use waveform_backend::gateway::GatewayBackend;
use waveform_backend::routes::configure_routes;

fn startup_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    log::error!("{}: {}", context, err);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    }

    let config = ServerConfig::from_env().map_err(|e| startup_error("Invalid configuration", e))?;
    let settings = AnalysisSettings::load(config.analysis_config.as_deref())
        .map_err(|e| startup_error("Failed to load analysis config", e))?;

    let gateway = GatewayBackend::from_config(&config)
        .await
        .map_err(|e| startup_error("Failed to initialise reference store", e))?;
    log::info!(
        "Reference store: {}, gateway timeout {:?}",
        gateway.kind(),
        settings.gateway.timeout()
    );

    let analyzer = web::Data::new(Analyzer::new(gateway, settings.gateway.timeout()));

    let jwt_service = config.jwt_secret.as_deref().map(JwtService::new);
    if jwt_service.is_none() {
        log::warn!("JWT_SECRET is not set; every request is analysed without user history.");
    }

    let bind_address = config.bind_address();
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        let app = App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::AUTHORIZATION,
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(analyzer.clone())
            .app_data(web::Data::new(settings.clone()));

        let app = match &jwt_service {
            Some(jwt) => app.app_data(web::Data::new(jwt.clone())),
            None => app,
        };

        app.configure(|cfg| configure_routes(cfg, &settings))
    })
    .bind(&bind_address)?
    .run()
    .await
}
