//! Hardening headers stamped onto every response by `security_headers`.

use actix_web::{test as actix_test, web, App, HttpResponse};

use campus_backend::security::security_headers;

#[actix_rt::test]
async fn every_response_carries_the_hardening_set() {
    let app = actix_test::init_service(
        App::new()
            .wrap(security_headers())
            .route("/", web::get().to(HttpResponse::Ok)),
    )
    .await;

    let req = actix_test::TestRequest::get().uri("/").to_request();
    let resp = actix_test::call_service(&app, req).await;
    let headers = resp.headers();

    assert_eq!(
        headers.get("Strict-Transport-Security").unwrap(),
        "max-age=31536000; includeSubDomains"
    );
    assert_eq!(headers.get("X-Content-Type-Options").unwrap(), "nosniff");
    assert_eq!(headers.get("X-Frame-Options").unwrap(), "DENY");
    assert_eq!(headers.get("Referrer-Policy").unwrap(), "no-referrer");
    assert_eq!(
        headers.get("Content-Security-Policy").unwrap(),
        "default-src 'none'; frame-ancestors 'none'"
    );
}

#[actix_rt::test]
async fn responses_are_marked_uncacheable() {
    let app = actix_test::init_service(
        App::new()
            .wrap(security_headers())
            .route("/", web::post().to(HttpResponse::Ok)),
    )
    .await;

    let req = actix_test::TestRequest::post().uri("/").to_request();
    let resp = actix_test::call_service(&app, req).await;

    // Login and refresh responses carry tokens; no-store keeps them out of
    // shared caches.
    assert_eq!(resp.headers().get("Cache-Control").unwrap(), "no-store");
}

#[actix_rt::test]
async fn error_responses_keep_the_headers() {
    let app = actix_test::init_service(
        App::new()
            .wrap(security_headers())
            .route("/missing", web::get().to(HttpResponse::NotFound))
            .route("/broken", web::get().to(HttpResponse::InternalServerError)),
    )
    .await;

    for path in ["/missing", "/broken"] {
        let req = actix_test::TestRequest::get().uri(path).to_request();
        let resp = actix_test::call_service(&app, req).await;

        assert!(resp.headers().get("Content-Security-Policy").is_some());
        assert!(resp.headers().get("X-Frame-Options").is_some());
        assert!(resp.headers().get("Cache-Control").is_some());
    }
}

#[actix_rt::test]
async fn handlers_may_override_a_default() {
    // DefaultHeaders only fills in headers the handler did not set itself.
    let app = actix_test::init_service(App::new().wrap(security_headers()).route(
        "/",
        web::get().to(|| async {
            HttpResponse::Ok()
                .insert_header(("X-Frame-Options", "SAMEORIGIN"))
                .finish()
        }),
    ))
    .await;

    let req = actix_test::TestRequest::get().uri("/").to_request();
    let resp = actix_test::call_service(&app, req).await;

    assert_eq!(resp.headers().get("X-Frame-Options").unwrap(), "SAMEORIGIN");
}
