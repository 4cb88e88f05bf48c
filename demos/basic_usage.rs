//! Basic usage example for the ApiTrace Actix SDK
//!
//! Run with:
//! ```bash
//! APITRACE_APPLICATION_ID=demo_app \
//! APITRACE_BASE_URL=http://localhost:9000 \
//! APITRACE_DEBUG=true \
//! cargo run --example basic_usage
//! ```

use std::sync::Arc;

use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use apitrace_actix::prelude::*;

/// Skips health checks, identifies users by header and strips credentials
struct DemoPolicy;

impl PolicyHooks for DemoPolicy {
    fn skip(&self, req: &HttpRequest) -> bool {
        req.path() == "/health"
    }

    fn identify_user(&self, req: &HttpRequest, _res: &ResponseMeta<'_>) -> Option<String> {
        req.headers()
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    fn mask_content(&self, mut event: Event) -> Option<Event> {
        event.request.headers.remove("authorization");
        event.request.headers.remove("cookie");
        event.response.headers.remove("set-cookie");
        Some(event)
    }
}

async fn index() -> HttpResponse {
    HttpResponse::Ok().body("Hello ApiTrace!")
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "example-app"
    }))
}

async fn echo(body: web::Bytes) -> HttpResponse {
    HttpResponse::Ok().body(body)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    println!("Starting example server on http://0.0.0.0:8080");
    println!("  GET  http://localhost:8080/");
    println!("  GET  http://localhost:8080/health   (not captured)");
    println!("  POST http://localhost:8080/echo");

    let trace = ApiTraceMiddleware::new(Config::from_env()).with_policy(Arc::new(DemoPolicy));

    HttpServer::new(move || {
        App::new()
            .wrap(trace.clone())
            .service(web::resource("/").route(web::get().to(index)))
            .service(web::resource("/health").route(web::get().to(health)))
            .service(web::resource("/echo").route(web::post().to(echo)))
    })
    .bind("0.0.0.0:8080")?
    .run()
    .await
}
