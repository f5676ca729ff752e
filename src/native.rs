//! Native actix-web host for the router. Requests are converted to Spin
//! requests, routed on tokio's blocking pool, and converted back.

use std::sync::Arc;

use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use tracing_actix_web::TracingLogger;

use crate::config::Config;
use crate::core::store::{open_store, Store};
use crate::core::AppContext;
use crate::handlers::route;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store + Send + Sync>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store + Send + Sync>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let store: Arc<dyn Store + Send + Sync> = Arc::from(open_store(&config)?);
        Ok(Self::new(store, config))
    }
}

mod adapter {
    use actix_web::HttpRequest;
    use spin_sdk::http::{Method, Request};

    pub fn actix_to_spin_request(req: &HttpRequest, body: actix_web::web::Bytes) -> Request {
        let method = match req.method().as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "HEAD" => Method::Head,
            "OPTIONS" => Method::Options,
            "PATCH" => Method::Patch,
            other => Method::Other(other.to_string()),
        };

        let uri = req.uri().to_string();
        let mut builder = Request::builder();
        builder.method(method).uri(&uri);

        for (name, value) in req.headers() {
            if let Ok(val_str) = value.to_str() {
                builder.header(name.as_str(), val_str);
            }
        }

        builder.body(body.to_vec()).build()
    }

    pub fn spin_to_actix_response(spin_resp: spin_sdk::http::Response) -> actix_web::HttpResponse {
        let status = *spin_resp.status();

        let mut response = actix_web::HttpResponse::build(
            actix_web::http::StatusCode::from_u16(status)
                .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR),
        );
        for (name, value) in spin_resp.headers() {
            if let Some(val_str) = value.as_str() {
                response.insert_header((name.to_string(), val_str.to_string()));
            }
        }

        response.body(spin_resp.body().to_vec())
    }
}

async fn handle_all(state: web::Data<AppState>, req: HttpRequest, body: web::Bytes) -> HttpResponse {
    let spin_req = adapter::actix_to_spin_request(&req, body);
    let state = state.get_ref().clone();

    let result = tokio::task::spawn_blocking(move || {
        let ctx = AppContext::new(state.store.as_ref(), &state.config);
        route(&ctx, spin_req)
    })
    .await;

    match result {
        Ok(spin_resp) => adapter::spin_to_actix_response(spin_resp),
        Err(e) => {
            tracing::error!("request handler panicked: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({"error": "Internal server error"}))
        }
    }
}

/// Registers the catch-all route; used by the server and by tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.default_service(web::route().to(handle_all));
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let bind_addr = config.bind_addr.clone();
    let state = AppState::from_config(config)?;

    tracing::info!("Server listening on http://{}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(TracingLogger::default())
            .configure(configure)
    })
    .bind(&bind_addr)?
    .run()
    .await?;

    Ok(())
}
