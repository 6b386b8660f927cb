// Self-play tool: engine against itself or against a seeded random mover
//
// Usage:
//   cargo run --release --bin selfplay -- [options]
//
// Options:
//   --difficulty <N>     Difficulty level for the engine side(s) (default: 1)
//   --games <N>          Number of games to play (default: 1)
//   --opponent <kind>    engine | random (default: engine)
//   --seed <N>           Seed for the random opponent (default: 42)
//   --max-plies <N>      Declare a draw after this many plies (default: 200)
//   --config <path>      Path to Quoridor.toml (default: Quoridor.toml)

use log::info;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use std::env;
use std::process;

use quoridor_ai::config::Config;
use quoridor_ai::engine::Engine;
use quoridor_ai::types::{Move, Player};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Opponent {
    Engine,
    Random,
}

struct Options {
    difficulty: u8,
    games: u32,
    opponent: Opponent,
    seed: u64,
    max_plies: u32,
    config_path: String,
}

fn print_usage() {
    eprintln!("Quoridor AI Self-Play Tool");
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("  selfplay [OPTIONS]");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("  --difficulty <N>     Difficulty level for the engine (default: 1)");
    eprintln!("  --games <N>          Number of games to play (default: 1)");
    eprintln!("  --opponent <kind>    engine | random (default: engine)");
    eprintln!("  --seed <N>           Seed for the random opponent (default: 42)");
    eprintln!("  --max-plies <N>      Draw after this many plies (default: 200)");
    eprintln!("  --config <path>      Path to Quoridor.toml (default: Quoridor.toml)");
    eprintln!("  --help               Show this help message");
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut options = Options {
        difficulty: 1,
        games: 1,
        opponent: Opponent::Engine,
        seed: 42,
        max_plies: 200,
        config_path: "Quoridor.toml".to_string(),
    };

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        let value = args
            .get(i + 1)
            .ok_or_else(|| format!("{} requires an argument", flag))?;
        let number = |v: &str| v.parse::<u64>().map_err(|e| format!("Invalid value for {}: {}", flag, e));
        match flag {
            "--difficulty" => options.difficulty = number(value.as_str())?.min(u8::MAX as u64) as u8,
            "--games" => options.games = number(value.as_str())? as u32,
            "--seed" => options.seed = number(value.as_str())?,
            "--max-plies" => options.max_plies = number(value.as_str())? as u32,
            "--config" => options.config_path = value.clone(),
            "--opponent" => {
                options.opponent = match value.as_str() {
                    "engine" => Opponent::Engine,
                    "random" => Opponent::Random,
                    other => return Err(format!("Unknown opponent '{}'", other)),
                }
            }
            _ => return Err(format!("Unknown option '{}'", flag)),
        }
        i += 2;
    }
    Ok(options)
}

/// Plays one game; returns the winner (None on a draw) and the move list
fn play_game(
    engine: &Engine,
    options: &Options,
    rng: &mut StdRng,
) -> Result<(Option<Player>, Vec<Move>), String> {
    let (game, mut state) = engine
        .start_game(options.difficulty)
        .map_err(|e| format!("Could not create board: {}", e))?;
    let mut moves = Vec::new();

    for _ in 0..options.max_plies {
        if let Some(winner) = state.is_terminal() {
            engine.end_game(&game);
            return Ok((Some(winner), moves));
        }

        let side = state.turn();
        let mv = if side == Player::B && options.opponent == Opponent::Random {
            let legal = engine.legal_moves(&state, side);
            *legal
                .choose(rng)
                .ok_or_else(|| format!("{} has no legal move", side))?
        } else {
            engine
                .choose_move_in(&game, &state, options.difficulty)
                .map_err(|e| e.to_string())?
        };

        state = engine
            .apply_move_in(&game, &state, mv)
            .map_err(|e| format!("Engine produced illegal move {}: {}", mv, e))?;
        moves.push(mv);
    }

    engine.end_game(&game);
    Ok((state.is_terminal(), moves))
}

fn main() {
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "warn");
    }
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.contains(&"--help".to_string()) {
        print_usage();
        process::exit(0);
    }

    let options = match parse_args(&args) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            process::exit(1);
        }
    };

    let config = Config::from_file(&options.config_path).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from '{}': {}", options.config_path, e);
        eprintln!("Using default configuration");
        Config::default_hardcoded()
    });

    let engine = Engine::new(config);
    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut tally = [0u32; 3];

    for game in 1..=options.games {
        match play_game(&engine, &options, &mut rng) {
            Ok((winner, moves)) => {
                let listed: Vec<String> = moves.iter().map(|m| m.to_string()).collect();
                println!("Game {}: {} plies", game, moves.len());
                println!("  {}", listed.join(" "));
                match winner {
                    Some(p) => {
                        println!("  Winner: {}", p);
                        tally[p.index()] += 1;
                    }
                    None => {
                        println!("  Draw (ply limit)");
                        tally[2] += 1;
                    }
                }
            }
            Err(e) => {
                eprintln!("Game {} aborted: {}", game, e);
                engine.persist_or_warn();
                process::exit(1);
            }
        }
    }

    println!();
    println!("A wins: {}  B wins: {}  Draws: {}", tally[0], tally[1], tally[2]);

    let (hits, misses) = engine.path_cache().stats();
    info!(
        "Path cache: {} entries, {} hits, {} misses; search cache: {} entries",
        engine.path_cache().len(),
        hits,
        misses,
        engine.search_cache().len()
    );
    engine.persist_or_warn();
}
