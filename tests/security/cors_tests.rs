//! CORS allowlist behavior: configured origins are echoed back, unlisted
//! origins pass through without CORS headers, and preflights are validated.

use actix_web::http::{header, Method, StatusCode};
use actix_web::{test as actix_test, web, App, HttpResponse};

use campus_backend::config::SecurityConfig;
use campus_backend::security::cors_middleware;

fn test_config() -> SecurityConfig {
    SecurityConfig {
        cors_allowed_origins: vec![
            "http://localhost:3000".to_string(),
            "https://portal.campus.example".to_string(),
            "https://admin.campus.example".to_string(),
        ],
        metrics_allow_private_only: true,
        metrics_admin_token: None,
    }
}

#[actix_rt::test]
async fn allowed_origins_are_echoed_back() {
    let config = test_config();
    let app = actix_test::init_service(
        App::new()
            .wrap(cors_middleware(&config))
            .route("/", web::get().to(HttpResponse::Ok)),
    )
    .await;

    for origin in &config.cors_allowed_origins {
        let req = actix_test::TestRequest::get()
            .uri("/")
            .insert_header((header::ORIGIN, origin.as_str()))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            origin.as_str()
        );
        assert_eq!(
            resp.headers()
                .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
                .unwrap(),
            "true"
        );
    }
}

#[actix_rt::test]
async fn unlisted_origins_get_no_cors_headers() {
    let config = test_config();
    let app = actix_test::init_service(
        App::new()
            .wrap(cors_middleware(&config))
            .route("/", web::get().to(HttpResponse::Ok)),
    )
    .await;

    let req = actix_test::TestRequest::get()
        .uri("/")
        .insert_header((header::ORIGIN, "https://evil.example"))
        .to_request();
    let resp = actix_test::call_service(&app, req).await;

    // The response still reaches the wire; without an allow-origin header
    // the browser refuses to hand it to the page.
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
    assert!(resp
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
        .is_none());
}

#[actix_rt::test]
async fn requests_without_an_origin_are_untouched() {
    let config = test_config();
    let app = actix_test::init_service(
        App::new()
            .wrap(cors_middleware(&config))
            .route("/", web::get().to(HttpResponse::Ok)),
    )
    .await;

    let req = actix_test::TestRequest::get().uri("/").to_request();
    let resp = actix_test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[actix_rt::test]
async fn preflight_grants_the_session_verbs() {
    let config = test_config();
    let app = actix_test::init_service(
        App::new()
            .wrap(cors_middleware(&config))
            .route("/", web::post().to(HttpResponse::Ok)),
    )
    .await;

    let req = actix_test::TestRequest::default()
        .method(Method::OPTIONS)
        .uri("/")
        .insert_header((header::ORIGIN, "http://localhost:3000"))
        .insert_header((header::ACCESS_CONTROL_REQUEST_METHOD, "POST"))
        .insert_header((
            header::ACCESS_CONTROL_REQUEST_HEADERS,
            "authorization, content-type",
        ))
        .to_request();
    let resp = actix_test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:3000"
    );

    let methods = resp
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_METHODS)
        .unwrap()
        .to_str()
        .unwrap();
    for verb in ["GET", "POST", "DELETE"] {
        assert!(methods.contains(verb), "allow-methods missing {verb}: {methods}");
    }

    let allowed_headers = resp
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_HEADERS)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(allowed_headers.contains("authorization"));

    assert_eq!(
        resp.headers().get(header::ACCESS_CONTROL_MAX_AGE).unwrap(),
        "3600"
    );
}

#[actix_rt::test]
async fn preflight_from_an_unlisted_origin_is_rejected() {
    let config = test_config();
    let app = actix_test::init_service(
        App::new()
            .wrap(cors_middleware(&config))
            .route("/", web::post().to(HttpResponse::Ok)),
    )
    .await;

    let req = actix_test::TestRequest::default()
        .method(Method::OPTIONS)
        .uri("/")
        .insert_header((header::ORIGIN, "https://evil.example"))
        .insert_header((header::ACCESS_CONTROL_REQUEST_METHOD, "POST"))
        .to_request();
    let resp = actix_test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn preflight_for_an_unsupported_verb_is_rejected() {
    let config = test_config();
    let app = actix_test::init_service(
        App::new()
            .wrap(cors_middleware(&config))
            .route("/", web::post().to(HttpResponse::Ok)),
    )
    .await;

    // The API exposes no PUT surface, so the allowlist omits the verb.
    let req = actix_test::TestRequest::default()
        .method(Method::OPTIONS)
        .uri("/")
        .insert_header((header::ORIGIN, "http://localhost:3000"))
        .insert_header((header::ACCESS_CONTROL_REQUEST_METHOD, "PUT"))
        .to_request();
    let resp = actix_test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
