// HTTP handler bindings for the match API
//
// Thin wrappers that bind Rocket routes to the Bot's methods. Handlers
// deserialize the request, pull the Bot out of managed state and delegate.

use log::warn;
use rocket::http::Status;
use rocket::serde::json::Json;
use serde_json::Value;

use capture_agents::bot::Bot;
use capture_agents::types::GameState;

/// GET / endpoint
/// Returns bot metadata
#[get("/")]
pub fn index(bot: &rocket::State<Bot>) -> Json<Value> {
    Json(bot.info())
}

/// POST /start endpoint
/// Called when a match starts for one of our agents
#[post("/start", format = "json", data = "<start_req>")]
pub fn start(bot: &rocket::State<Bot>, start_req: Json<GameState>) -> Status {
    match bot.start(&start_req) {
        Ok(()) => Status::Ok,
        Err(e) => {
            warn!("Rejected start request: {}", e);
            Status::BadRequest
        }
    }
}

/// POST /move endpoint
/// Called each turn to compute and return the next move
#[post("/move", format = "json", data = "<move_req>")]
pub fn get_move(bot: &rocket::State<Bot>, move_req: Json<GameState>) -> Result<Json<Value>, Status> {
    bot.get_move(&move_req).map(Json).map_err(|e| {
        warn!("Rejected move request: {}", e);
        Status::BadRequest
    })
}

/// POST /end endpoint
/// Called when a match ends - drops the agent's session
#[post("/end", format = "json", data = "<end_req>")]
pub fn end(bot: &rocket::State<Bot>, end_req: Json<GameState>) -> Status {
    bot.end(&end_req);

    Status::Ok
}
