// Defender policy
//
// Guards the home half: walks to the home pellet the enemy is most likely to
// target first, then patrols that pellet's column, chasing visible intruders
// and investigating pellets that disappear out of sight.

use log::{debug, info, warn};
use std::collections::{BTreeSet, VecDeque};

use crate::config::DefenderConfig;
use crate::oracle::{BoardOracle, Side};
use crate::planner::{best_first_search, closest_target, column_ends};
use crate::random::RandomSource;
use crate::types::{Move, Position};

/// Behaviour chosen for a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefendBranch {
    Opening,
    Pursue,
    Investigate,
    Patrol,
}

/// Counters carried across turns
#[derive(Debug, Clone, Default)]
pub struct DefendState {
    pub turn: u32,
    pub opening_goal: Option<Position>,
    pub opening: VecDeque<Move>,
    pub opening_started: bool,
    /// Bottom and top ends of the patrolled column
    pub patrol: Option<(Position, Position)>,
    pub last_patrolled: Option<Position>,
    pub targets_last_turn: BTreeSet<Position>,
    /// Most recent home pellet that vanished and has not been visited yet
    pub lost_food: Option<Position>,
    pub capsules_last_turn: usize,
    /// Turns the enemy attacker stays powered up
    pub capsule_effect: u32,
    pub last_branch: Option<DefendBranch>,
}

impl DefendState {
    pub fn new(board: &dyn BoardOracle) -> Self {
        DefendState {
            targets_last_turn: board.targets(Side::Home).into_iter().collect(),
            capsules_last_turn: board.capsules(Side::Home).len(),
            ..DefendState::default()
        }
    }
}

/// Route penalty for stepping outside home territory
pub fn defend_heuristic(enemy_field_cost: u32) -> impl Fn(Position, &dyn BoardOracle) -> u32 {
    move |pos: Position, board: &dyn BoardOracle| {
        if board.in_home_territory(pos) {
            1
        } else {
            enemy_field_cost
        }
    }
}

/// Whether a powered-up intruder is safe to chase
///
/// Chasing pays off only when the effect wears off before we can reach the
/// intruder; an equal count means we would arrive while it is still powered.
pub fn should_pursue(capsule_effect: u32, distance: u32) -> bool {
    capsule_effect == 0 || capsule_effect < distance
}

pub struct DefendPolicy {
    config: DefenderConfig,
    state: DefendState,
}

impl DefendPolicy {
    /// Creates the policy from the first observation of the board
    pub fn new(config: DefenderConfig, board: &dyn BoardOracle) -> Self {
        DefendPolicy {
            config,
            state: DefendState::new(board),
        }
    }

    pub fn state(&self) -> &DefendState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut DefendState {
        &mut self.state
    }

    /// Chooses this turn's move; always legal from the current position
    ///
    /// Enemies on their own half cannot capture a defender on ours, so no
    /// collision filter is applied.
    pub fn choose_move(&mut self, board: &dyn BoardOracle, _rng: &mut dyn RandomSource) -> Move {
        self.update_counters(board);

        let (branch, chosen) = self.decide(board);
        self.state.last_branch = Some(branch);

        if board.legal_moves().contains(&chosen) {
            chosen
        } else {
            warn!("Defender: {} is not legal from {}, stopping", chosen, board.own_position());
            Move::Stop
        }
    }

    fn decide(&mut self, board: &dyn BoardOracle) -> (DefendBranch, Move) {
        if let Some(mv) = self.state.opening.pop_front() {
            self.state.opening_started = true;
            return (DefendBranch::Opening, mv);
        }

        let intruder = board
            .visible_enemies()
            .into_iter()
            .find(|pos| board.in_home_territory(*pos));
        if let Some(enemy) = intruder {
            return self.decide_intruder(board, enemy);
        }

        if let Some(lost) = self.state.lost_food {
            if lost != board.own_position() {
                info!("Defender: a home pellet was eaten, heading to {}", lost);
                return (DefendBranch::Investigate, self.step_towards(board, lost));
            }
            info!("Defender: reached the eaten pellet at {}", lost);
            self.state.lost_food = None;
        }

        (DefendBranch::Patrol, self.patrol(board))
    }

    fn update_counters(&mut self, board: &dyn BoardOracle) {
        self.state.turn += 1;
        let here = board.own_position();

        if self.state.opening_goal.is_none() {
            self.plan_opening(board);
        }

        if self.state.opening_started && here == board.own_spawn() && !self.state.opening.is_empty() {
            info!("Defender: respawned at {}, dropping the rest of the opening", here);
            self.state.opening.clear();
        }

        let targets: BTreeSet<Position> = board.targets(Side::Home).into_iter().collect();
        if let Some(&eaten) = self.state.targets_last_turn.difference(&targets).next() {
            info!("Defender: home pellet at {} disappeared", eaten);
            self.state.lost_food = Some(eaten);
        }
        self.state.targets_last_turn = targets;

        let capsules = board.capsules(Side::Home).len();
        if capsules < self.state.capsules_last_turn {
            self.state.capsule_effect = self.config.capsule_effect_duration;
            info!(
                "Defender: an intruder ate a capsule! remaining turns: {}",
                self.state.capsule_effect
            );
        } else if self.state.capsule_effect > 0 {
            self.state.capsule_effect -= 1;
            debug!("Defender: capsule effect active, remaining turns: {}", self.state.capsule_effect);
        }
        self.state.capsules_last_turn = capsules;
    }

    /// Route to the home target nearest the enemy spawn, and patrol its column
    fn plan_opening(&mut self, board: &dyn BoardOracle) {
        let targets = board.targets(Side::Home);
        let anchor = board
            .enemy_spawns()
            .first()
            .and_then(|&spawn| closest_target(board, spawn, &targets));

        let goal = match anchor {
            Some(goal) => goal,
            None => {
                debug!("Defender: no reachable home target to guard yet");
                return;
            }
        };

        info!("Defender: start of match, heading to the pellet at {}", goal);
        self.state.opening_goal = Some(goal);
        self.state.opening = best_first_search(board, board.own_position(), goal, self.heuristic())
            .map(|route| route.moves)
            .unwrap_or_default();
        self.state.patrol = column_ends(board, goal.x);
    }

    fn heuristic(&self) -> impl Fn(Position, &dyn BoardOracle) -> u32 {
        defend_heuristic(self.config.enemy_field_cost)
    }

    fn step_towards(&self, board: &dyn BoardOracle, goal: Position) -> Move {
        best_first_search(board, board.own_position(), goal, self.heuristic())
            .and_then(|route| route.first_move())
            .unwrap_or(Move::Stop)
    }

    fn decide_intruder(&mut self, board: &dyn BoardOracle, enemy: Position) -> (DefendBranch, Move) {
        let distance = board.maze_distance(board.own_position(), enemy);
        let effect = self.state.capsule_effect;

        if should_pursue(effect, distance) {
            info!(
                "Defender: pursuing intruder at {} (distance {}, capsule effect {})",
                enemy, distance, effect
            );
            return (DefendBranch::Pursue, self.step_towards(board, enemy));
        }

        info!(
            "Defender: intruder at {} is powered for {} more turns at distance {}, patrolling",
            enemy, effect, distance
        );
        (DefendBranch::Patrol, self.patrol(board))
    }

    /// Alternates between the column ends, switching only on arrival
    fn patrol(&mut self, board: &dyn BoardOracle) -> Move {
        let (bottom, top) = match self.state.patrol {
            Some(ends) => ends,
            None => return Move::Stop,
        };

        let here = board.own_position();
        let goal = if here == bottom {
            self.state.last_patrolled = Some(bottom);
            top
        } else if here == top {
            self.state.last_patrolled = Some(top);
            bottom
        } else {
            match self.state.last_patrolled {
                Some(last) if last == bottom => top,
                Some(_) => bottom,
                None => {
                    if board.maze_distance(here, bottom) < board.maze_distance(here, top) {
                        bottom
                    } else {
                        top
                    }
                }
            }
        };

        debug!("Defender: patrolling towards {}", goal);
        self.step_towards(board, goal)
    }
}
