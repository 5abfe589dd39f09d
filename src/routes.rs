use actix_web::web;

use crate::handlers;
use crate::utils::AppError;

/// Malformed bodies, queries and paths come back in the same error shape as
/// everything else.
fn extractor_configs(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(8 * 1024 * 1024)
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    );
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    extractor_configs(cfg);

    cfg.service(
        web::scope("/api/v1")
            // Auth
            .service(
                web::scope("/auth")
                    .service(handlers::auth::signup)
                    .service(handlers::auth::login)
                    .service(handlers::auth::logout)
                    .service(handlers::auth::current_session),
            )
            // Users
            .service(
                web::scope("/users")
                    .service(handlers::users::get_me)
                    .service(handlers::users::update_location)
                    .service(handlers::users::dashboard)
                    .service(handlers::users::members),
            )
            // Surplus; fixed paths before /{id}
            .service(
                web::scope("/surplus")
                    .service(handlers::surplus::list_surplus)
                    .service(handlers::surplus::create_listing)
                    .service(handlers::surplus::swipe_deck)
                    .service(handlers::surplus::map_markers)
                    .service(handlers::surplus::get_surplus)
                    .service(handlers::surplus::begin_checkout)
                    .service(handlers::surplus::claim_free)
                    .service(handlers::surplus::route_to_item),
            )
            // Payment callbacks
            .service(
                web::scope("/checkouts")
                    .service(handlers::checkouts::payment_success)
                    .service(handlers::checkouts::payment_failure)
                    .service(handlers::checkouts::get_checkout),
            )
            .service(
                web::scope("/notifications")
                    .service(handlers::notifications::get_notifications)
                    .service(handlers::notifications::open_notifications),
            )
            // Health check
            .route("/health", web::get().to(handlers::health::health_check)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, RoutingConfig, StorageConfig};
    use crate::models::common::GeoPoint;
    use crate::models::surplus::{ListingFields, SurplusItem};
    use crate::models::user::{User, UserType};
    use crate::services::{
        auth::{self, AuthService},
        claims::ClaimService,
        database::DatabaseService,
        listing::ListingService,
        notifications::NotificationService,
        razorpay::{self, RazorpayService},
        routing::RoutingService,
        storage::ImageStorageService,
    };
    use actix_web::http::{header, StatusCode};
    use actix_web::web::Data;
    use actix_web::{test, App};
    use rust_decimal::Decimal;
    use serde_json::{json, Value};

    fn register(cfg: &mut web::ServiceConfig, db: DatabaseService) {
        let notifications = NotificationService::new(db.clone(), 20);
        let storage = ImageStorageService::new(StorageConfig {
            api_url: "https://cdn.invalid".to_string(),
            cloud_name: "test".to_string(),
            upload_preset: "test".to_string(),
            max_image_bytes: 1024,
            timeout_secs: 1,
        });

        cfg.app_data(Data::new(db.clone()))
            .app_data(Data::new(AuthService::new(db.clone(), auth::test_config())))
            .app_data(Data::new(ClaimService::new(
                db.clone(),
                RazorpayService::new(razorpay::test_config()),
            )))
            .app_data(Data::new(ListingService::new(
                db.clone(),
                storage,
                notifications.clone(),
                "INR".to_string(),
            )))
            .app_data(Data::new(notifications))
            .app_data(Data::new(RoutingService::new(RoutingConfig {
                base_url: "https://router.invalid".to_string(),
                profile: "driving".to_string(),
                timeout_secs: 1,
            })))
            .app_data(Data::new(AppConfig::default()));
    }

    async fn seed_item(db: &DatabaseService, price: Decimal) -> SurplusItem {
        let store = User::new("shop@example.com".to_string(), None, UserType::Store, None, None);
        db.create_user(&store, "h").await.unwrap();
        let item = SurplusItem::new(
            ListingFields {
                title: "Bananas".to_string(),
                description: "Ripe".to_string(),
                quantity: "2 dozen".to_string(),
                location: "Worli".to_string(),
                geolocation: Some(GeoPoint::new(19.0176, 72.8162)),
                price,
            },
            &store,
            "https://cdn.example.com/bananas.png".to_string(),
            "INR".to_string(),
        );
        db.create_surplus(&item).await.unwrap()
    }

    #[actix_web::test]
    async fn test_browsing_is_public() {
        let db = DatabaseService::in_memory().await.unwrap();
        seed_item(&db, Decimal::ZERO).await;
        let app = test::init_service(
            App::new()
                .configure(|cfg| register(cfg, db.clone()))
                .configure(configure),
        )
        .await;

        for uri in [
            "/api/v1/surplus",
            "/api/v1/surplus?status=available",
            "/api/v1/surplus/deck",
            "/api/v1/surplus/map",
            "/api/v1/users/members/store",
        ] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK, "{}", uri);
        }

        let req = test::TestRequest::get().uri("/api/v1/surplus").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let req = test::TestRequest::get().uri("/api/v1/users/members/store").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"][0]["display_name"], "shop");
    }

    #[actix_web::test]
    async fn test_anonymous_writes_redirect_to_login() {
        let db = DatabaseService::in_memory().await.unwrap();
        let item = seed_item(&db, Decimal::ZERO).await;
        let app = test::init_service(
            App::new()
                .configure(|cfg| register(cfg, db.clone()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/surplus/{}/claim", item.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["redirect"], "/login");
        assert_eq!(body["success"], false);

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/surplus/{}/checkout", item.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/api/v1/surplus")
            .insert_header((header::AUTHORIZATION, "Bearer not-a-real-token"))
            .set_json(json!({
                "title": "Sneaky", "description": "x", "quantity": "1", "location": "x"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let stored = db.get_surplus(&item.id).await.unwrap().unwrap();
        assert!(stored.claimed_by.is_none());
        assert_eq!(db.list_surplus(Default::default()).await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn test_signup_then_claim_free_item() {
        let db = DatabaseService::in_memory().await.unwrap();
        let item = seed_item(&db, Decimal::ZERO).await;
        let app = test::init_service(
            App::new()
                .configure(|cfg| register(cfg, db.clone()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/auth/signup")
            .set_json(json!({
                "email": "kitchen@ngo.org",
                "password": "secret1",
                "confirm_password": "secret1",
                "user_type": "ngo",
                "display_name": "Community Kitchen"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        let token = body["data"]["token"].as_str().unwrap().to_string();
        let bearer = format!("Bearer {}", token);

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/surplus/{}/claim", item.id))
            .insert_header((header::AUTHORIZATION, bearer.clone()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["claimed_by_name"], "Community Kitchen");

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/surplus/{}/claim", item.id))
            .insert_header((header::AUTHORIZATION, bearer.clone()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "already_claimed");

        let req = test::TestRequest::get()
            .uri("/api/v1/surplus/map")
            .insert_header((header::AUTHORIZATION, bearer.clone()))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["markers"][0]["state"], "claimed");
        assert_eq!(body["data"]["center"]["latitude"], 19.076);

        let req = test::TestRequest::get()
            .uri("/api/v1/users/me/dashboard")
            .insert_header((header::AUTHORIZATION, bearer.clone()))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);

        let req = test::TestRequest::post()
            .uri("/api/v1/auth/logout")
            .insert_header((header::AUTHORIZATION, bearer.clone()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri("/api/v1/auth/session")
            .insert_header((header::AUTHORIZATION, bearer))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_signup_form_errors() {
        let db = DatabaseService::in_memory().await.unwrap();
        let app = test::init_service(
            App::new()
                .configure(|cfg| register(cfg, db.clone()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/auth/signup")
            .set_json(json!({
                "email": "kitchen@ngo.org",
                "password": "secret1",
                "confirm_password": "secret2",
                "user_type": ""
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Passwords do not match");

        let req = test::TestRequest::post()
            .uri("/api/v1/auth/signup")
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "validation_failed");

        assert!(db.get_user_by_email("kitchen@ngo.org").await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn test_health() {
        let db = DatabaseService::in_memory().await.unwrap();
        let app = test::init_service(
            App::new()
                .configure(|cfg| register(cfg, db.clone()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"]["total_users"], 0);
    }
}
