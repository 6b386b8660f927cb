//! HTTP API Tests
//!
//! Drives the mounted routes through Rocket's local client with caching
//! disabled so nothing touches the working directory.

use rocket::http::{ContentType, Status};
use rocket::local::blocking::Client;
use serde_json::{json, Value};

use quoridor_ai::board::BoardState;
use quoridor_ai::bot::Bot;
use quoridor_ai::config::Config;
use quoridor_ai::debug_logger::DebugLogger;
use quoridor_ai::handler;
use quoridor_ai::types::{Coord, Move, Player};

fn client() -> Client {
    let mut config = Config::default_hardcoded();
    config.cache.enabled = false;
    let bot = Bot::new(config, DebugLogger::disabled());
    let rocket = rocket::build().manage(bot).mount("/", handler::routes());
    Client::tracked(rocket).expect("valid rocket instance")
}

fn post(client: &Client, uri: &'static str, body: Value) -> (Status, Value) {
    let response = client
        .post(uri)
        .header(ContentType::JSON)
        .body(body.to_string())
        .dispatch();
    let status = response.status();
    let value = response.into_json::<Value>().unwrap_or(Value::Null);
    (status, value)
}

#[test]
fn test_index_describes_engine() {
    let client = client();
    let response = client.get("/").dispatch();
    assert_eq!(response.status(), Status::Ok);
    let info: Value = response.into_json().unwrap();
    assert_eq!(info["apiversion"], json!("1"));
    assert_eq!(info["difficulty"].as_array().map(|d| d.len()), Some(3));
}

#[test]
fn test_legal_moves_for_opening() {
    let client = client();
    let board = BoardState::new(9, 9, 10).unwrap();
    let (status, body) = post(
        &client,
        "/legal-moves",
        json!({ "state": board, "player": Player::A }),
    );
    assert_eq!(status, Status::Ok);
    let moves: Vec<Move> = serde_json::from_value(body).unwrap();
    // 3 pawn steps and 128 wall slots, no bomb with nothing to hit
    assert_eq!(moves.len(), 131);
    assert!(!moves.contains(&Move::PowerBomb));
}

#[test]
fn test_apply_returns_next_state() {
    let client = client();
    let board = BoardState::new(9, 9, 10).unwrap();
    let mv = Move::PawnMove {
        target: Coord::new(1, 4),
    };
    let (status, body) = post(&client, "/apply", json!({ "state": board, "move": mv }));
    assert_eq!(status, Status::Ok);
    let next: BoardState = serde_json::from_value(body).unwrap();
    assert_eq!(next.pawn(Player::A), Coord::new(1, 4));
    assert_eq!(next.turn(), Player::B);
}

#[test]
fn test_apply_illegal_move_is_rejected() {
    let client = client();
    let board = BoardState::new(9, 9, 10).unwrap();
    let mv = Move::PawnMove {
        target: Coord::new(3, 4),
    };
    let (status, body) = post(&client, "/apply", json!({ "state": board, "move": mv }));
    assert_eq!(status, Status::UnprocessableEntity);
    assert!(body["error"].is_string());
}

#[test]
fn test_move_endpoint_returns_legal_move() {
    let client = client();
    let board = BoardState::new(9, 9, 10).unwrap();
    let (status, body) = post(
        &client,
        "/move",
        json!({ "state": board, "difficulty": 1, "turn": 0 }),
    );
    assert_eq!(status, Status::Ok);
    assert_eq!(body["depth"], json!(1));
    let mv: Move = serde_json::from_value(body["move"].clone()).unwrap();
    assert!(board.apply_move(mv).is_ok());
}

#[test]
fn test_move_endpoint_rejects_finished_game() {
    let client = client();
    let mut snap = BoardState::new(5, 5, 5).unwrap().snapshot();
    snap.pawn_positions.a = Coord::new(4, 0);
    let board = BoardState::try_from(snap).unwrap();
    let (status, body) = post(&client, "/move", json!({ "state": board, "difficulty": 3 }));
    assert_eq!(status, Status::UnprocessableEntity);
    assert!(body["error"].as_str().is_some());
}

#[test]
fn test_malformed_board_is_rejected() {
    let client = client();
    let mut board = serde_json::to_value(BoardState::new(5, 5, 5).unwrap()).unwrap();
    board["pawn_positions"]["B"] = board["pawn_positions"]["A"].clone();
    let (status, _) = post(&client, "/move", json!({ "state": board, "difficulty": 1 }));
    assert_eq!(status, Status::UnprocessableEntity);
}

#[test]
fn test_games_have_their_own_history() {
    let client = client();
    let (status, started) = post(&client, "/games", json!({ "difficulty": 2 }));
    assert_eq!(status, Status::Ok);
    let first = started["game_id"].as_str().unwrap().to_string();
    let opening: BoardState = serde_json::from_value(started["state"].clone()).unwrap();
    let (_, other) = post(&client, "/games", json!({ "difficulty": 2 }));
    let second = other["game_id"].as_str().unwrap().to_string();
    assert_ne!(first, second);

    let (_, before) = post(
        &client,
        "/move",
        json!({ "state": opening, "difficulty": 2, "game_id": second }),
    );

    let forward = Move::PawnMove {
        target: Coord::new(1, 4),
    };
    let (status, _) = post(
        &client,
        "/apply",
        json!({ "state": opening, "move": forward, "game_id": first }),
    );
    assert_eq!(status, Status::Ok);

    let (_, after) = post(
        &client,
        "/move",
        json!({ "state": opening, "difficulty": 2, "game_id": second }),
    );
    assert_eq!(after["move"], before["move"]);
    assert_eq!(after["move"], serde_json::to_value(forward).unwrap());

    let reset_uri = format!("/games/{}/reset", first);
    let reset = client.post(reset_uri.as_str()).dispatch();
    assert_eq!(reset.status(), Status::NoContent);
    let game_uri = format!("/games/{}", first);
    let ended = client.delete(game_uri.as_str()).dispatch();
    assert_eq!(ended.status(), Status::NoContent);
    let missing = client.delete(game_uri.as_str()).dispatch();
    assert_eq!(missing.status(), Status::NotFound);
}
