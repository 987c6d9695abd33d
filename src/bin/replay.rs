// Standalone replay tool for analyzing capture agent decision logs
//
// Usage:
//   cargo run --bin replay -- <log_file> [options]
//
// Options:
//   --all                  Replay all turns
//   --turns <turn1,turn2>  Replay specific turns (comma-separated)
//   --validate             Run validation mode with expected moves
//   --agent <index>        Only look at one agent's entries
//   --verbose              Show detailed output for each turn
//   --config <path>        Path to Capture.toml (default: Capture.toml)

use std::env;
use std::process;

use capture_agents::config::Config;
use capture_agents::replay::ReplayEngine;
use capture_agents::types::Move;

enum Mode {
    All,
    Turns(String),
    Validate(String),
}

fn print_usage() {
    eprintln!("Capture Agents Replay Tool");
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("  replay <log_file> [OPTIONS]");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("  --all                   Replay all turns in the log");
    eprintln!("  --turns <T1,T2,...>     Replay specific turns (comma-separated)");
    eprintln!("  --validate <T:M,...>    Validate expected moves (format: turn:move,...)");
    eprintln!("  --agent <index>         Only consider entries of one agent");
    eprintln!("  --verbose               Show detailed output for each turn");
    eprintln!("  --config <path>         Path to Capture.toml (default: Capture.toml)");
    eprintln!("  --help                  Show this help message");
    eprintln!();
    eprintln!("EXAMPLES:");
    eprintln!("  # Replay all turns");
    eprintln!("  replay capture_decisions.jsonl --all");
    eprintln!();
    eprintln!("  # Replay specific turns of agent 0");
    eprintln!("  replay capture_decisions.jsonl --turns 5,10,15 --agent 0");
    eprintln!();
    eprintln!("  # Validate expected moves");
    eprintln!("  replay capture_decisions.jsonl --validate 5:north,10:east|west --agent 1");
}

fn parse_turns(s: &str) -> Result<Vec<i32>, String> {
    s.split(',')
        .map(|t| {
            t.trim()
                .parse::<i32>()
                .map_err(|e| format!("Invalid turn number '{}': {}", t, e))
        })
        .collect()
}

fn parse_expected_moves(s: &str) -> Result<Vec<(i32, Vec<Move>)>, String> {
    s.split(',')
        .map(|pair| {
            let parts: Vec<&str> = pair.trim().split(':').collect();
            if parts.len() != 2 {
                return Err(format!("Invalid format '{}'. Expected 'turn:move'", pair));
            }

            let turn = parts[0]
                .parse::<i32>()
                .map_err(|e| format!("Invalid turn number '{}': {}", parts[0], e))?;

            // Support multiple acceptable moves separated by '|'
            let moves: Result<Vec<Move>, String> =
                parts[1].split('|').map(|m| m.trim().parse::<Move>()).collect();

            Ok((turn, moves?))
        })
        .collect()
}

fn next_arg(args: &[String], i: usize, flag: &str) -> String {
    match args.get(i + 1) {
        Some(value) => value.clone(),
        None => {
            eprintln!("Error: {} requires an argument", flag);
            process::exit(1);
        }
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args.contains(&"--help".to_string()) {
        print_usage();
        process::exit(if args.contains(&"--help".to_string()) {
            0
        } else {
            1
        });
    }

    let log_file = &args[1];
    let mut config_path = "Capture.toml".to_string();
    let mut verbose = false;
    let mut agent_filter: Option<usize> = None;
    let mut mode = None;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--all" => {
                mode = Some(Mode::All);
            }
            "--turns" => {
                mode = Some(Mode::Turns(next_arg(&args, i, "--turns")));
                i += 1;
            }
            "--validate" => {
                mode = Some(Mode::Validate(next_arg(&args, i, "--validate")));
                i += 1;
            }
            "--agent" => {
                let raw = next_arg(&args, i, "--agent");
                agent_filter = match raw.parse::<usize>() {
                    Ok(index) => Some(index),
                    Err(e) => {
                        eprintln!("Error: invalid agent index '{}': {}", raw, e);
                        process::exit(1);
                    }
                };
                i += 1;
            }
            "--config" => {
                config_path = next_arg(&args, i, "--config");
                i += 1;
            }
            "--verbose" => {
                verbose = true;
            }
            _ => {
                eprintln!("Error: Unknown option '{}'", args[i]);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    let mode = match mode {
        Some(mode) => mode,
        None => {
            eprintln!("Error: Must specify --all, --turns, or --validate");
            print_usage();
            process::exit(1);
        }
    };

    let config = Config::from_file(&config_path).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from '{}': {}", config_path, e);
        eprintln!("Using default configuration");
        Config::default_hardcoded()
    });

    println!("Loaded configuration from: {}", config_path);
    println!("Replay log file: {}", log_file);
    println!();

    let engine = ReplayEngine::new(config, verbose);

    let mut entries = match engine.load_log_file(log_file) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("Error loading log file: {}", e);
            process::exit(1);
        }
    };

    if let Some(agent) = agent_filter {
        entries.retain(|e| e.agent == agent);
    }

    if entries.is_empty() {
        eprintln!("Error: No log entries to replay");
        process::exit(1);
    }

    println!("Loaded {} log entries\n", entries.len());

    match mode {
        Mode::All => {
            println!("Replaying all {} turns...\n", entries.len());
            match engine.replay_all(&entries) {
                Ok(results) => engine.print_report(&results),
                Err(e) => {
                    eprintln!("Error during replay: {}", e);
                    process::exit(1);
                }
            }
        }
        Mode::Turns(raw) => {
            let turns = match parse_turns(&raw) {
                Ok(t) => t,
                Err(e) => {
                    eprintln!("Error parsing turns: {}", e);
                    process::exit(1);
                }
            };

            println!("Replaying {} specific turn(s)...\n", turns.len());
            match engine.replay_turns(&entries, &turns) {
                Ok(results) => engine.print_report(&results),
                Err(e) => {
                    eprintln!("Error during replay: {}", e);
                    process::exit(1);
                }
            }
        }
        Mode::Validate(raw) => {
            let expected_moves = match parse_expected_moves(&raw) {
                Ok(m) => m,
                Err(e) => {
                    eprintln!("Error parsing expected moves: {}", e);
                    process::exit(1);
                }
            };

            println!("Validating {} expected move(s)...\n", expected_moves.len());
            match engine.validate_expected_moves(&entries, &expected_moves) {
                Ok(()) => println!("✓ All expected moves validated successfully!"),
                Err(e) => {
                    eprintln!("✗ Validation failed: {}", e);
                    process::exit(1);
                }
            }
        }
    }
}
