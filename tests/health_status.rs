use actix_web::{test, web, App};
use chat_relay::{
    handlers::{health::health_check, status::status_handler},
    services::session_registry::SessionRegistry,
    AppState,
};

fn create_test_app_state() -> AppState {
    AppState::new(SessionRegistry::new())
}

#[actix_rt::test]
async fn test_health_check_returns_ok() {
    let app_state = create_test_app_state();
    let _alice = app_state.sessions.register("alice", None);

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(app_state))
            .route("/health", web::get().to(health_check)),
    )
    .await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;

    assert!(resp.status().is_success());

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
    assert!(body["uptime_seconds"].is_number());
    assert_eq!(body["connections"], 1);
}

#[actix_rt::test]
async fn test_status_handler_reflects_participants_and_groups() {
    let app_state = create_test_app_state();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .route("/status", web::get().to(status_handler)),
    )
    .await;

    let req = test::TestRequest::get().uri("/status").to_request();
    let resp = test::call_service(&app, req).await;
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["connections"]["active"], 0);
    assert_eq!(body["connections"]["participants"].as_array().unwrap().len(), 0);

    let _bob = app_state.sessions.register("bob", Some("eng".into()));
    let _alice = app_state.sessions.register("alice", None);

    let req = test::TestRequest::get().uri("/status").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body: serde_json::Value = test::read_body_json(resp).await;

    assert_eq!(body["connections"]["active"], 2);
    assert_eq!(
        body["connections"]["participants"],
        serde_json::json!(["alice", "bob"])
    );
    assert_eq!(body["connections"]["groups"], serde_json::json!(["eng"]));
    assert!(body["messages"]["processed"].is_number());
    assert!(body["messages"]["parse_errors"].is_number());
    assert!(body["deliveries"]["failed"].is_number());
}
