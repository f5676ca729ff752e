#[cfg(not(target_arch = "wasm32"))]
#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Failed to read .env: {}", e);
        }
    }
    roost::telemetry::init();

    let config = roost::config::Config::from_env()?;
    roost::native::run(config).await
}

#[cfg(target_arch = "wasm32")]
fn main() {}
