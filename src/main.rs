use actix_cors::Cors;
use actix_web::{self, middleware::Logger, web, App, HttpServer};

use crate::modules::image::{model::UploadConfig, service::ImageService};

mod api;
mod configs;
mod constants;
mod modules;
#[cfg(test)]
mod test;
mod utils;

/// JSON body ceiling for batch migrations.
const MIGRATE_JSON_LIMIT: usize = 50 * 1024 * 1024;

fn cors(origin: Option<&str>) -> Cors {
    match origin {
        Some(origin) => Cors::default()
            .allowed_origin(origin)
            .allowed_methods(vec!["GET", "POST", "DELETE", "OPTIONS"])
            .allow_any_header()
            .max_age(3600),
        None => Cors::permissive(),
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let env = constants::Env::load().map_err(|e| std::io::Error::other(e.to_string()))?;
    log::info!("Environment variables loaded");

    let http = configs::http_client().map_err(|e| std::io::Error::other(e.to_string()))?;
    let backends =
        configs::build_backends(&env, http).map_err(|e| std::io::Error::other(e.to_string()))?;

    let image_service = ImageService::with_dependencies(
        backends.repo,
        backends.host,
        UploadConfig::default().with_share_base_url(env.website_base_url.clone()),
    );

    log::info!("Starting server at http://{}:{}", env.ip, env.port);
    let cors_origin = env.cors_origin.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(cors(cors_origin.as_deref()))
            .app_data(web::Data::new(image_service.clone()))
            .app_data(web::JsonConfig::default().limit(MIGRATE_JSON_LIMIT))
            .service(web::scope("/api").configure(modules::image::route::configure))
    })
    .bind((env.ip.as_str(), env.port))?
    .workers(2)
    .run()
    .await
}
