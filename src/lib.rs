pub mod auth;
pub mod config;
pub mod core;
pub mod follow;
pub mod handlers;
pub mod models;
pub mod posts;
pub mod telemetry;
pub mod users;

#[cfg(not(target_arch = "wasm32"))]
pub mod native;

// === Component entrypoint ===
#[cfg(target_arch = "wasm32")]
mod component {
    use spin_sdk::http::{IntoResponse, Request, Response};
    use spin_sdk::http_component;

    use crate::config::Config;
    use crate::core::errors::ApiError;
    use crate::core::store::open_store;
    use crate::core::AppContext;

    #[http_component]
    fn handle(req: Request) -> anyhow::Result<impl IntoResponse> {
        crate::telemetry::init();

        let config = match Config::from_env() {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("configuration error: {:#}", e);
                let resp: Response = ApiError::InternalError("Server misconfigured".to_string()).into();
                return Ok(resp);
            }
        };
        let store = open_store(&config)?;
        let ctx = AppContext::new(store.as_ref(), &config);

        Ok(crate::handlers::route(&ctx, req))
    }
}
