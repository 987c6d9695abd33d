// Match-facing entry point
//
// The match engine addresses every request to one agent of one match. The bot
// keeps a session per (match, agent) holding the maze layout, the agent's
// policy and its random source, so policy counters survive between turns.
// Agents of the same match share one layout. Sessions that see no request
// for `SESSION_IDLE_LIMIT` are dropped, for matches that never call /end.

use log::{info, warn};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::agent::Agent;
use crate::config::Config;
use crate::debug_logger::DebugLogger;
use crate::layout::Layout;
use crate::oracle::TurnView;
use crate::random::session_rng;
use crate::types::{GameState, Move};

const SESSION_IDLE_LIMIT: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SessionKey {
    game_id: String,
    agent: usize,
}

impl SessionKey {
    fn of(state: &GameState) -> Self {
        SessionKey {
            game_id: state.game.id.clone(),
            agent: state.you,
        }
    }
}

/// Everything one agent keeps for the length of a match
struct Session {
    layout: Arc<Layout>,
    agent: Agent,
    rng: StdRng,
    last_seen: Instant,
}

impl Session {
    fn create(state: &GameState, layout: Arc<Layout>, config: &Config) -> Result<Self, String> {
        let role = state.resolve_role()?;
        let agent = {
            let view = TurnView::new(&layout, state)?;
            Agent::new(role, config, &view)
        };
        let rng = session_rng(config.match_rules.rng_seed, state.you);

        info!(
            "Match {}: agent {} plays {:?} on a {}x{} maze",
            state.game.id,
            state.you,
            role,
            layout.width(),
            layout.height()
        );

        Ok(Session {
            layout,
            agent,
            rng,
            last_seen: Instant::now(),
        })
    }
}

type SharedSession = Arc<Mutex<Session>>;

/// Capture agents bot
/// Takes static configuration and exposes methods corresponding to the match API
pub struct Bot {
    config: Config,
    sessions: Mutex<HashMap<SessionKey, SharedSession>>,
    debug_logger: DebugLogger,
}

impl Bot {
    /// Creates a new Bot instance with the given configuration
    ///
    /// # Arguments
    /// * `config` - Static configuration that does not change during the bot's lifetime
    pub fn new(config: Config) -> Self {
        Self::with_debug_logger(config, DebugLogger::disabled())
    }

    pub fn with_debug_logger(config: Config, debug_logger: DebugLogger) -> Self {
        Bot {
            config,
            sessions: Mutex::new(HashMap::new()),
            debug_logger,
        }
    }

    /// Returns agent metadata
    /// Corresponds to GET / endpoint
    pub fn info(&self) -> Value {
        info!("INFO");

        json!({
            "apiversion": "1",
            "author": "capture-agents",
            "roles": ["Attacker", "Defender"],
        })
    }

    /// Layout of a match some other agent already plays
    fn shared_layout(&self, game_id: &str) -> Option<Arc<Layout>> {
        self.sessions
            .lock()
            .iter()
            .filter(|(key, _)| key.game_id == game_id)
            .find_map(|(_, session)| session.try_lock().map(|s| Arc::clone(&s.layout)))
    }

    /// Builds a session without holding the session table lock
    fn create_session(&self, state: &GameState) -> Result<Session, String> {
        let layout = match self.shared_layout(&state.game.id) {
            Some(layout) => layout,
            None => Arc::new(Layout::parse(&state.board.maze)?),
        };
        Session::create(state, layout, &self.config)
    }

    /// Drops sessions that have not been used for longer than `max_idle`
    ///
    /// Sessions busy deciding a move are kept.
    ///
    /// # Returns
    /// * `usize` - Number of sessions dropped
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|key, session| {
            let keep = session
                .try_lock()
                .map_or(true, |s| s.last_seen.elapsed() < max_idle);
            if !keep {
                info!("Match {}: dropping idle session of agent {}", key.game_id, key.agent);
            }
            keep
        });
        before - sessions.len()
    }

    /// Called when a match starts; creates the agent's session
    /// Corresponds to POST /start endpoint
    pub fn start(&self, state: &GameState) -> Result<(), String> {
        info!("MATCH START {} for agent {}", state.game.id, state.you);
        self.evict_idle(SESSION_IDLE_LIMIT);
        let session = self.create_session(state)?;
        self.sessions
            .lock()
            .insert(SessionKey::of(state), Arc::new(Mutex::new(session)));
        Ok(())
    }

    /// Called when a match ends; drops the agent's session
    /// Corresponds to POST /end endpoint
    pub fn end(&self, state: &GameState) {
        info!("MATCH OVER {} for agent {}", state.game.id, state.you);
        self.sessions.lock().remove(&SessionKey::of(state));
    }

    /// Computes this turn's move for the addressed agent
    /// Corresponds to POST /move endpoint
    ///
    /// A session is created on the fly when the start call was missed. The
    /// session table is only locked to look the session up, so agents of
    /// other matches decide concurrently.
    ///
    /// # Returns
    /// * `Result<Value, String>` - JSON response containing the chosen move
    pub fn get_move(&self, state: &GameState) -> Result<Value, String> {
        let start_time = Instant::now();
        let key = SessionKey::of(state);

        let existing = self.sessions.lock().get(&key).cloned();
        let shared = match existing {
            Some(session) => session,
            None => {
                warn!(
                    "Match {}: no session for agent {}, creating one mid-match",
                    state.game.id, state.you
                );
                self.evict_idle(SESSION_IDLE_LIMIT);
                let session = Arc::new(Mutex::new(self.create_session(state)?));
                Arc::clone(self.sessions.lock().entry(key).or_insert(session))
            }
        };

        let (chosen, role) = {
            let mut guard = shared.lock();
            let session = &mut *guard;
            session.last_seen = Instant::now();
            let view = TurnView::new(&session.layout, state)?;
            let chosen = session.agent.choose_move(&view, &mut session.rng);
            (chosen, session.agent.role())
        };

        info!(
            "Turn {}: agent {} ({:?}) chose {} (time: {}us)",
            state.turn,
            state.you,
            role,
            chosen,
            start_time.elapsed().as_micros()
        );

        if self.debug_logger.is_enabled() {
            self.debug_logger.log_move(state.clone(), role, chosen);
        }

        Ok(json!({ "move": chosen.as_str() }))
    }

    /// Number of live sessions
    pub fn active_sessions(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Parses the `move` field of a `get_move` response
    pub fn parse_response(response: &Value) -> Result<Move, String> {
        response["move"]
            .as_str()
            .ok_or_else(|| "Response has no move".to_string())?
            .parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELD: [&str; 3] = ["%%%%%%", "%1  2%", "%%%%%%"];

    #[test]
    fn test_agents_of_one_match_share_the_layout() {
        let bot = Bot::new(Config::default_hardcoded());
        let red = GameState::from_layout("m", &FIELD, 0).unwrap();
        let blue = GameState::from_layout("m", &FIELD, 1).unwrap();
        bot.start(&red).unwrap();
        bot.start(&blue).unwrap();

        let sessions = bot.sessions.lock();
        let layout_of = |agent: usize| {
            let key = SessionKey {
                game_id: "m".to_string(),
                agent,
            };
            Arc::clone(&sessions[&key].lock().layout)
        };
        assert!(Arc::ptr_eq(&layout_of(0), &layout_of(1)));
    }
}
