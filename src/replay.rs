// Replay module for analyzing logged matches and debugging decision-making
//
// This module provides functionality to:
// 1. Parse JSONL decision logs
// 2. Replay each agent's turns in order through a fresh policy
// 3. Compare logged vs replayed moves
// 4. Generate detailed analysis reports
//
// Policies carry counters across turns, so a turn can only be reproduced by
// replaying every earlier turn of the same agent first.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Instant;

use crate::agent::Agent;
use crate::config::Config;
use crate::layout::Layout;
use crate::oracle::TurnView;
use crate::random::session_rng;
use crate::types::{GameState, Move, Role};

/// Represents a single log entry from the debug JSONL file
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LogEntry {
    pub turn: i32,
    pub agent: usize,
    pub role: Role,
    pub chosen_move: Move,
    pub state: GameState,
    pub timestamp: String,
}

/// Result of replaying a single turn
#[derive(Debug, Clone)]
pub struct ReplayResult {
    pub game_id: String,
    pub agent: usize,
    pub turn: i32,
    pub original_move: Move,
    pub replayed_move: Move,
    pub matches: bool,
    pub computation_time_us: u128,
}

/// Statistics for a complete replay session
#[derive(Debug, Default)]
pub struct ReplayStats {
    pub total_turns: usize,
    pub matches: usize,
    pub mismatches: usize,
    pub match_rate: f64,
}

/// Replay engine for analyzing debug logs
pub struct ReplayEngine {
    config: Config,
    verbose: bool,
}

impl ReplayEngine {
    /// Creates a new replay engine with the given configuration
    pub fn new(config: Config, verbose: bool) -> Self {
        ReplayEngine { config, verbose }
    }

    /// Loads all log entries from a JSONL file
    pub fn load_log_file<P: AsRef<Path>>(&self, log_path: P) -> Result<Vec<LogEntry>, String> {
        let file = File::open(log_path.as_ref())
            .map_err(|e| format!("Failed to open log file: {}", e))?;

        let reader = BufReader::new(file);
        let mut entries = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| format!("Failed to read line {}: {}", line_num + 1, e))?;

            if line.trim().is_empty() {
                continue;
            }

            let entry: LogEntry = serde_json::from_str(&line)
                .map_err(|e| format!("Failed to parse JSON on line {}: {}", line_num + 1, e))?;

            entries.push(entry);
        }

        info!("Loaded {} log entries", entries.len());
        Ok(entries)
    }

    /// Splits entries into per-(match, agent) streams ordered by turn
    fn streams(entries: &[LogEntry]) -> BTreeMap<(String, usize), Vec<&LogEntry>> {
        let mut streams: BTreeMap<(String, usize), Vec<&LogEntry>> = BTreeMap::new();
        for entry in entries {
            streams
                .entry((entry.state.game.id.clone(), entry.agent))
                .or_default()
                .push(entry);
        }
        for stream in streams.values_mut() {
            stream.sort_by_key(|e| e.turn);
        }
        streams
    }

    /// Replays one agent's turns through a fresh policy
    fn replay_stream(&self, stream: &[&LogEntry]) -> Result<Vec<ReplayResult>, String> {
        let first = match stream.first() {
            Some(first) => first,
            None => return Ok(Vec::new()),
        };

        let layout = Layout::parse(&first.state.board.maze)?;
        let mut agent = {
            let view = TurnView::new(&layout, &first.state)?;
            Agent::new(first.role, &self.config, &view)
        };
        let mut rng = session_rng(Some(self.config.match_rules.rng_seed.unwrap_or(0)), first.agent);

        let mut results = Vec::with_capacity(stream.len());
        for entry in stream {
            let start_time = Instant::now();
            let view = TurnView::new(&layout, &entry.state)?;
            let replayed_move = agent.choose_move(&view, &mut rng);

            let result = ReplayResult {
                game_id: entry.state.game.id.clone(),
                agent: entry.agent,
                turn: entry.turn,
                original_move: entry.chosen_move,
                replayed_move,
                matches: replayed_move == entry.chosen_move,
                computation_time_us: start_time.elapsed().as_micros(),
            };

            if self.verbose {
                if result.matches {
                    info!(
                        "Turn {} agent {}: ✓ MATCH - {} (time: {}us)",
                        result.turn, result.agent, replayed_move, result.computation_time_us
                    );
                } else {
                    warn!(
                        "Turn {} agent {}: ✗ MISMATCH - Original: {}, Replayed: {} (time: {}us)",
                        result.turn,
                        result.agent,
                        result.original_move,
                        replayed_move,
                        result.computation_time_us
                    );
                }
            }

            results.push(result);
        }

        Ok(results)
    }

    /// Replays all entries in a log file
    pub fn replay_all(&self, entries: &[LogEntry]) -> Result<Vec<ReplayResult>, String> {
        let mut results = Vec::new();

        for ((game_id, agent), stream) in Self::streams(entries) {
            if self.verbose {
                info!("Replaying match {} agent {} ({} turns)", game_id, agent, stream.len());
            }
            match self.replay_stream(&stream) {
                Ok(stream_results) => results.extend(stream_results),
                Err(e) => {
                    warn!("Failed to replay match {} agent {}: {}", game_id, agent, e);
                }
            }
        }

        Ok(results)
    }

    /// Replays everything, reporting only the requested turns
    pub fn replay_turns(
        &self,
        entries: &[LogEntry],
        turn_numbers: &[i32],
    ) -> Result<Vec<ReplayResult>, String> {
        for turn_num in turn_numbers {
            if !entries.iter().any(|e| e.turn == *turn_num) {
                return Err(format!("Turn {} not found in log file", turn_num));
            }
        }

        Ok(self
            .replay_all(entries)?
            .into_iter()
            .filter(|r| turn_numbers.contains(&r.turn))
            .collect())
    }

    /// Generates statistics from replay results
    pub fn generate_stats(&self, results: &[ReplayResult]) -> ReplayStats {
        let total_turns = results.len();
        let matches = results.iter().filter(|r| r.matches).count();
        let mismatches = total_turns - matches;
        let match_rate = if total_turns > 0 {
            (matches as f64 / total_turns as f64) * 100.0
        } else {
            0.0
        };

        ReplayStats {
            total_turns,
            matches,
            mismatches,
            match_rate,
        }
    }

    /// Prints a detailed report of replay results
    pub fn print_report(&self, results: &[ReplayResult]) {
        let stats = self.generate_stats(results);

        println!("\n═══════════════════════════════════════════════════════════");
        println!("                    REPLAY REPORT");
        println!("═══════════════════════════════════════════════════════════");
        println!("Total Turns:    {}", stats.total_turns);
        println!("Matches:        {} ({:.1}%)", stats.matches, stats.match_rate);
        println!("Mismatches:     {}", stats.mismatches);
        println!("═══════════════════════════════════════════════════════════\n");

        if !results.is_empty() {
            let avg_time: f64 = results.iter().map(|r| r.computation_time_us as f64).sum::<f64>()
                / results.len() as f64;
            println!("Average Decision Time:   {:.1}us\n", avg_time);
        }

        let mismatches: Vec<_> = results.iter().filter(|r| !r.matches).collect();
        if !mismatches.is_empty() {
            println!("═══════════════════════════════════════════════════════════");
            println!("                  DETAILED MISMATCHES");
            println!("═══════════════════════════════════════════════════════════");

            for result in mismatches {
                println!(
                    "Match {} agent {} turn {}: {} → {}",
                    result.game_id,
                    result.agent,
                    result.turn,
                    result.original_move,
                    result.replayed_move
                );
            }
            println!();
        }
    }

    /// Validates that specific expected moves were made
    pub fn validate_expected_moves(
        &self,
        entries: &[LogEntry],
        expected_moves: &[(i32, Vec<Move>)], // (turn, acceptable_moves)
    ) -> Result<(), String> {
        for (turn, acceptable) in expected_moves {
            let entry = entries
                .iter()
                .find(|e| e.turn == *turn)
                .ok_or_else(|| format!("Turn {} not found in log", turn))?;

            if !acceptable.contains(&entry.chosen_move) {
                return Err(format!(
                    "Turn {}: Expected one of {:?}, but got {}",
                    turn,
                    acceptable.iter().map(|m| m.as_str()).collect::<Vec<_>>(),
                    entry.chosen_move
                ));
            }
        }

        Ok(())
    }
}
