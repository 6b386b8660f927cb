// HTTP handler bindings for the engine API
//
// Thin wrappers that bind Rocket routes to Bot methods. Handlers are responsible for:
// - Deserializing incoming JSON requests
// - Extracting the Bot instance from Rocket's managed state
// - Delegating to Bot methods
// - Mapping failures to 422 responses carrying the error text

use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::{delete, get, post, routes, Route};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::board::BoardState;
use crate::bot::Bot;
use crate::types::{Move, Player};

type Rejection = Custom<Json<Value>>;

fn reject(message: String) -> Rejection {
    Custom(Status::UnprocessableEntity, Json(json!({ "error": message })))
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub state: BoardState,
    pub difficulty: u8,
    /// Only used to label log lines
    #[serde(default)]
    pub turn: u32,
    /// Game whose repetition history steers the search
    #[serde(default)]
    pub game_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LegalMovesRequest {
    pub state: BoardState,
    pub player: Player,
}

#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    pub state: BoardState,
    #[serde(rename = "move")]
    pub mv: Move,
    /// Game whose repetition history records the move
    #[serde(default)]
    pub game_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewGameRequest {
    pub difficulty: u8,
}

/// GET / endpoint
/// Returns engine metadata and the difficulty table
#[get("/")]
pub fn index(bot: &rocket::State<Bot>) -> Json<Value> {
    Json(bot.info())
}

/// POST /move endpoint
/// Computes the AI's move for the side to move
#[post("/move", format = "json", data = "<move_req>")]
pub async fn get_move(
    bot: &rocket::State<Bot>,
    move_req: Json<MoveRequest>,
) -> Result<Json<Value>, Rejection> {
    let MoveRequest {
        state,
        difficulty,
        turn,
        game_id,
    } = move_req.into_inner();

    let result = bot
        .get_move(state, difficulty, turn, game_id)
        .await
        .map_err(|e| reject(e.to_string()))?;

    Ok(Json(json!({
        "move": result.best_move,
        "score": result.score,
        "depth": result.depth,
        "stats": result.stats,
    })))
}

/// POST /legal-moves endpoint
/// Lists every legal move for a player, for highlighting human input
#[post("/legal-moves", format = "json", data = "<req>")]
pub fn legal_moves(bot: &rocket::State<Bot>, req: Json<LegalMovesRequest>) -> Json<Vec<Move>> {
    let LegalMovesRequest { state, player } = req.into_inner();
    Json(bot.legal_moves(state, player))
}

/// POST /apply endpoint
/// Applies a move for the side to move and returns the new board
#[post("/apply", format = "json", data = "<req>")]
pub fn apply(bot: &rocket::State<Bot>, req: Json<ApplyRequest>) -> Result<Json<BoardState>, Rejection> {
    let ApplyRequest { state, mv, game_id } = req.into_inner();
    bot.apply(state, mv, game_id.as_deref())
        .map(Json)
        .map_err(|e| reject(e.to_string()))
}

/// POST /games endpoint
/// Starts a game with its own repetition history
#[post("/games", format = "json", data = "<req>")]
pub fn new_game(bot: &rocket::State<Bot>, req: Json<NewGameRequest>) -> Result<Json<Value>, Rejection> {
    let (game_id, state) = bot
        .new_game(req.difficulty)
        .map_err(|e| reject(e.to_string()))?;
    Ok(Json(json!({ "game_id": game_id, "state": state })))
}

/// POST /games/<id>/reset endpoint
/// Forgets the game's repetition history
#[post("/games/<id>/reset")]
pub fn reset_game(bot: &rocket::State<Bot>, id: &str) -> Status {
    bot.reset_game(id);
    Status::NoContent
}

/// DELETE /games/<id> endpoint
#[delete("/games/<id>")]
pub fn end_game(bot: &rocket::State<Bot>, id: &str) -> Status {
    if bot.end_game(id) {
        Status::NoContent
    } else {
        Status::NotFound
    }
}

/// Every route of the API, mounted at "/"
pub fn routes() -> Vec<Route> {
    routes![index, get_move, legal_moves, apply, new_game, reset_game, end_game]
}
