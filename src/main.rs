use std::process;

use voice_chess::{
    engine::UciEngine, server::serve_turns, server_types::ServiceInfo, Config, TurnHandler,
};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}");
            process::exit(2);
        }
    };

    let info = ServiceInfo {
        id: env!("CARGO_PKG_NAME").to_string(),
        description: "Plays Black against spoken moves, one stateless turn at a time.".to_string(),
        think_ms: config.engine.limits.think_time.as_millis() as u64,
    };
    let app = serve_turns(TurnHandler::new(UciEngine::new(&config.engine)), info);

    log::info!(
        "listening on {} with engine {}",
        config.bind_addr,
        config.engine.path.display()
    );
    if let Err(e) = axum::Server::bind(&config.bind_addr)
        .serve(app.into_make_service())
        .await
    {
        log::error!("server error: {e}");
        process::exit(1);
    }
}
