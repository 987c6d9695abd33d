#[macro_use]
extern crate rocket;

use log::info;
use rocket::fairing::AdHoc;
use std::env;

use capture_agents::bot::Bot;
use capture_agents::config::Config;
use capture_agents::debug_logger::DebugLogger;

mod handler;

#[launch]
async fn rocket() -> _ {
    // Hosting services usually hand out the port through `PORT`, while Rocket reads
    // `ROCKET_PORT`. If we find a value for `PORT`, we set `ROCKET_PORT` to that value.
    if let Ok(port) = env::var("PORT") {
        env::set_var("ROCKET_PORT", &port);
    }

    // We default to 'info' level logging. But if the `RUST_LOG` environment variable is set,
    // we keep that value instead.
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }

    env_logger::init();

    info!("Starting capture agents server...");

    // Load configuration once at startup
    let config = Config::load_or_default();
    let debug_logger = DebugLogger::new(config.debug.enabled, &config.debug.log_file_path).await;
    let bot = Bot::with_debug_logger(config, debug_logger);

    rocket::build()
        .manage(bot)
        .attach(AdHoc::on_response("Server ID Middleware", |_, res| {
            Box::pin(async move {
                res.set_raw_header("Server", "capture-agents");
            })
        }))
        .mount(
            "/",
            routes![handler::index, handler::start, handler::get_move, handler::end],
        )
}
