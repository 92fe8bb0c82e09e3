use actix_web::{http::StatusCode, test, web, App, HttpResponse};
use htg_common::Secret;

use crate::{config::PMS_HMAC_HEADER, helpers::calculate_hmac, middleware::HmacMiddlewareFactory};

const SECRET: &str = "webhook-secret-for-tests";
const BODY: &[u8] = br#"{"booking_id":"B-1001","guest_name":"Ivanov"}"#;

async fn echo(body: web::Bytes) -> HttpResponse {
    HttpResponse::Ok().body(body)
}

async fn call_webhook(signature: Option<&str>, enabled: bool) -> Result<StatusCode, StatusCode> {
    let _ = env_logger::try_init().ok();
    let factory = HmacMiddlewareFactory::new(PMS_HMAC_HEADER, Secret::new(SECRET.to_string()), enabled);
    let app = App::new().service(web::scope("/webhook").wrap(factory).route("/pms", web::post().to(echo)));
    let service = test::init_service(app).await;
    let mut req = test::TestRequest::post().uri("/webhook/pms").set_payload(BODY.to_vec());
    if let Some(sig) = signature {
        req = req.insert_header((PMS_HMAC_HEADER, sig));
    }
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => Ok(res.status()),
        Err(e) => Err(e.as_response_error().status_code()),
    }
}

#[actix_web::test]
async fn valid_signature_is_accepted() {
    let sig = calculate_hmac(SECRET, BODY);
    let status = call_webhook(Some(&sig), true).await.expect("request should have been allowed through");
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn tampered_signature_is_rejected() {
    let mut sig = calculate_hmac(SECRET, BODY);
    sig.replace_range(0..4, "0000");
    let status = call_webhook(Some(&sig), true).await.expect_err("request should have been rejected");
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn signature_under_wrong_secret_is_rejected() {
    let sig = calculate_hmac("some-other-secret", BODY);
    let status = call_webhook(Some(&sig), true).await.expect_err("request should have been rejected");
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn missing_signature_is_rejected() {
    let status = call_webhook(None, true).await.expect_err("request should have been rejected");
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn disabled_checks_allow_unsigned_requests() {
    let status = call_webhook(None, false).await.expect("request should have been allowed through");
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn body_survives_verification() {
    // The middleware consumes the body to verify it; the handler must still see the original bytes.
    let _ = env_logger::try_init().ok();
    let factory = HmacMiddlewareFactory::new(PMS_HMAC_HEADER, Secret::new(SECRET.to_string()), true);
    let app = App::new().service(web::scope("/webhook").wrap(factory).route("/pms", web::post().to(echo)));
    let service = test::init_service(app).await;
    let sig = calculate_hmac(SECRET, BODY);
    let req = test::TestRequest::post()
        .uri("/webhook/pms")
        .insert_header((PMS_HMAC_HEADER, sig))
        .set_payload(BODY.to_vec())
        .to_request();
    let body = test::call_and_read_body(&service, req).await;
    assert_eq!(body.as_ref(), BODY);
}
