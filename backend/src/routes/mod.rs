pub mod auth;
pub mod children;
pub mod drivers;
pub mod health;
pub mod metrics;
pub mod profile;
pub mod tracking;
pub mod vehicles;
pub mod websocket;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::AppState;

/// All API routes. CORS and tracing layers are added by the binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(metrics::metrics_handler))
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        // Profile
        .route("/profile", get(profile::get_profile).put(profile::update_profile))
        .route("/children", post(children::create_child))
        .route("/children/{id}", put(children::update_child).delete(children::delete_child))
        .route("/drivers", post(drivers::create_driver))
        .route("/drivers/{id}", put(drivers::update_driver).delete(drivers::delete_driver))
        // Vehicles & live tracking
        .route(
            "/vehicles/{id}/locations",
            get(vehicles::location_history).post(vehicles::record_location),
        )
        .route("/vehicles/{id}/location", get(vehicles::latest_location))
        .route("/vehicles/{id}/map.svg", get(vehicles::map_svg))
        .route("/tracking", get(tracking::tracking_status))
        .route("/tracking/start", post(tracking::start_tracking))
        .route("/tracking/stop", post(tracking::stop_tracking))
        .route("/ws/tracking", get(websocket::ws_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::{config::Config, store::MemoryStore};

    const VIN: &str = "1HGCM82633A004352";

    fn app() -> Router {
        let state = AppState::new(Arc::new(MemoryStore::new()), Arc::new(Config::for_tests()));
        router(state)
    }

    async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Response {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        app.clone().oneshot(req).await.unwrap()
    }

    async fn json_body(res: Response) -> Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn register(app: &Router, email: &str, child: Option<Value>) -> String {
        let res = send(
            app,
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "name": "A", "email": email, "password": "pw", "child": child })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        assert!(res.headers().get(header::SET_COOKIE).is_some());
        json_body(res).await["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_register_duplicate_and_login_errors() {
        let app = app();
        register(&app, "a@example.com", None).await;

        let res = send(
            &app,
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "name": "B", "email": "a@example.com", "password": "x" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CONFLICT);

        let res = send(
            &app,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "a@example.com", "password": "wrong" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = send(
            &app,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "ghost@example.com", "password": "pw" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(res).await["error"], "Account not found");
    }

    #[tokio::test]
    async fn test_profile_requires_session() {
        let app = app();
        let res = send(&app, Method::GET, "/profile", None, None).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let token = register(&app, "a@example.com", None).await;
        let res = send(&app, Method::GET, "/profile", Some(&token), None).await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = send(&app, Method::POST, "/auth/logout", Some(&token), None).await;
        assert_eq!(res.status(), StatusCode::OK);
        // Logging out twice is harmless.
        let res = send(&app, Method::POST, "/auth/logout", Some(&token), None).await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = send(&app, Method::GET, "/profile", Some(&token), None).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_invalid_vin_rejected() {
        let app = app();
        let token = register(&app, "a@example.com", None).await;
        let res = send(
            &app,
            Method::POST,
            "/drivers",
            Some(&token),
            Some(json!({ "name": "Sam", "vin": "ABC" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_end_to_end_tracking_and_cascade() {
        let app = app();
        let token = register(
            &app,
            "a@example.com",
            Some(json!({ "name": "Timmy", "age": 9, "grade": "4", "school": "Lincoln" })),
        )
        .await;

        let res = send(
            &app,
            Method::POST,
            "/drivers",
            Some(&token),
            Some(json!({ "name": "Sam", "license_number": "D-1", "phone_number": "555", "vin": VIN })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let driver = json_body(res).await;
        let vehicle_id = driver["vehicles"][0]["id"].as_str().unwrap().to_string();

        let res = send(
            &app,
            Method::POST,
            "/tracking/start",
            Some(&token),
            Some(json!({ "vehicle_id": vehicle_id })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let snap = json_body(res).await;
        assert_eq!(snap["state"], "tracking");
        assert_eq!(snap["polls"], 1);

        let res = send(&app, Method::POST, "/tracking/stop", Some(&token), None).await;
        assert_eq!(json_body(res).await["state"], "idle");

        let res = send(
            &app,
            Method::GET,
            &format!("/vehicles/{vehicle_id}/locations"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(json_body(res).await.as_array().unwrap().len(), 1);

        let res = send(
            &app,
            Method::GET,
            &format!("/vehicles/{vehicle_id}/map.svg"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "image/svg+xml");

        // Removing the only child takes the account with it.
        let profile = json_body(send(&app, Method::GET, "/profile", Some(&token), None).await).await;
        let child_id = profile["children"][0]["id"].as_str().unwrap().to_string();
        let res = send(&app, Method::DELETE, &format!("/children/{child_id}"), Some(&token), None).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().get(header::SET_COOKIE).is_some());
        assert_eq!(json_body(res).await["account_deleted"], true);

        let res = send(&app, Method::GET, "/profile", Some(&token), None).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_other_accounts_vehicle_is_hidden() {
        let app = app();
        let owner = register(&app, "a@example.com", None).await;
        let stranger = register(&app, "b@example.com", None).await;

        let res = send(
            &app,
            Method::POST,
            "/drivers",
            Some(&owner),
            Some(json!({ "name": "Sam", "vin": VIN })),
        )
        .await;
        let vehicle_id = json_body(res).await["vehicles"][0]["id"]
            .as_str()
            .unwrap()
            .to_string();

        let res = send(
            &app,
            Method::GET,
            &format!("/vehicles/{vehicle_id}/location"),
            Some(&stranger),
            None,
        )
        .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = send(
            &app,
            Method::POST,
            &format!("/vehicles/{vehicle_id}/locations"),
            Some(&owner),
            Some(json!({ "latitude": 40.72, "longitude": -74.0 })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);

        let res = send(
            &app,
            Method::GET,
            &format!("/vehicles/{vehicle_id}/location"),
            Some(&owner),
            None,
        )
        .await;
        assert_eq!(json_body(res).await["latitude"], 40.72);
    }
}
