mod config;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;
mod utils;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web::Data, App, HttpServer};
use dotenv::dotenv;
use std::env;

use services::{
    auth::AuthService, claims::ClaimService, database::DatabaseService, listing::ListingService,
    notifications::NotificationService, razorpay::RazorpayService, routing::RoutingService,
    storage::ImageStorageService,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = match config::Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load configuration: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e));
        }
    };

    let database_service = DatabaseService::new(&config.database)
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

    let auth_service = AuthService::new(database_service.clone(), config.auth.clone());
    let razorpay_service = RazorpayService::new(config.razorpay.clone());
    let claim_service = ClaimService::new(database_service.clone(), razorpay_service);
    let notification_service =
        NotificationService::new(database_service.clone(), config.app.notification_feed_limit);
    let listing_service = ListingService::new(
        database_service.clone(),
        ImageStorageService::new(config.storage.clone()),
        notification_service.clone(),
        config.razorpay.currency.clone(),
    );
    let routing_service = RoutingService::new(config.routing.clone());
    let app_config = config.app.clone();

    let port = env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let bind_address = format!("0.0.0.0:{}", port);

    log::info!("Starting SwapLink API on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .supports_credentials(),
            )
            .app_data(Data::new(database_service.clone()))
            .app_data(Data::new(auth_service.clone()))
            .app_data(Data::new(claim_service.clone()))
            .app_data(Data::new(listing_service.clone()))
            .app_data(Data::new(notification_service.clone()))
            .app_data(Data::new(routing_service.clone()))
            .app_data(Data::new(app_config.clone()))
            .configure(routes::configure)
    })
    .bind(&bind_address)?
    .run()
    .await
}
