// Attacker policy
//
// Raids the enemy half for food and capsules:
// - opens the match by heading to one of the closest enemy pellets at random,
//   so both teammates do not take the same predictable path
// - goes for the closest enemy target while no enemy is close
// - flees home when an enemy on its own half comes within the flee distance,
//   unless a capsule effect is active
// - returns home after eating enough food, grabbing adjacent pellets on the
//   way when it is safe
// - after fleeing repeatedly in a short span, waits at a rally point inside
//   home territory for a few turns and attacks again from another angle

use log::{debug, info, warn};
use std::collections::VecDeque;

use crate::config::AttackerConfig;
use crate::oracle::{BoardOracle, Side};
use crate::planner::{
    avoid_collision, best_first_search, closest_target, column_ends, plan_to_closest,
    GoalSelection,
};
use crate::random::RandomSource;
use crate::types::{Move, Position};

/// Flee episodes needed before clustering is considered at all
const MIN_FLEE_HISTORY: usize = 5;
const FLEE_HISTORY_CAP: usize = 32;

/// Behaviour chosen for a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackBranch {
    Return,
    AttackFromHome,
    AttackInEnemyField,
}

/// Counters carried across turns
#[derive(Debug, Clone, Default)]
pub struct AttackState {
    pub turn: u32,
    pub targets_last_turn: usize,
    pub capsules_last_turn: usize,
    pub capsule_effect: u32,
    /// Pellets eaten since the last visit home
    pub food_eaten: u32,
    pub opening: VecDeque<Move>,
    pub opening_planned: bool,
    /// Turn numbers at which the attacker fled
    pub flee_turns: VecDeque<u32>,
    pub last_flee_checked: Option<u32>,
    pub rally_point: Option<Position>,
    /// Turns left in the forced-flee window
    pub forced_flee: u32,
    pub last_branch: Option<AttackBranch>,
}

impl AttackState {
    pub fn new(board: &dyn BoardOracle) -> Self {
        AttackState {
            targets_last_turn: board.targets(Side::Enemy).len(),
            capsules_last_turn: board.capsules(Side::Enemy).len(),
            ..AttackState::default()
        }
    }
}

/// Route penalty for cells within the flee distance of a threatening enemy
pub fn attack_heuristic(
    flee_distance: u32,
    enemy_close_cost: u32,
) -> impl Fn(Position, &dyn BoardOracle) -> u32 {
    move |pos: Position, board: &dyn BoardOracle| {
        let near_enemy = board
            .threatening_enemies()
            .into_iter()
            .any(|enemy| board.maze_distance(pos, enemy) < flee_distance);
        if near_enemy {
            enemy_close_cost
        } else {
            1
        }
    }
}

pub struct AttackPolicy {
    config: AttackerConfig,
    state: AttackState,
}

impl AttackPolicy {
    /// Creates the policy from the first observation of the board
    pub fn new(config: AttackerConfig, board: &dyn BoardOracle) -> Self {
        AttackPolicy {
            config,
            state: AttackState::new(board),
        }
    }

    pub fn state(&self) -> &AttackState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut AttackState {
        &mut self.state
    }

    /// Chooses this turn's move; always legal from the current position
    pub fn choose_move(&mut self, board: &dyn BoardOracle, rng: &mut dyn RandomSource) -> Move {
        self.update_counters(board);

        let branch = self.select_branch(board);
        self.state.last_branch = Some(branch);

        let chosen = match branch {
            AttackBranch::Return => self.decide_return(board, rng),
            AttackBranch::AttackFromHome => self.decide_attack_from_home(board, rng),
            AttackBranch::AttackInEnemyField => self.decide_in_enemy_field(board, rng),
        };

        if board.legal_moves().contains(&chosen) {
            chosen
        } else {
            warn!("Attacker: {} is not legal from {}, stopping", chosen, board.own_position());
            Move::Stop
        }
    }

    /// Branch for the current counters, without updating them
    pub fn select_branch(&self, board: &dyn BoardOracle) -> AttackBranch {
        if self.state.food_eaten > self.config.food_eaten_to_return
            || board.targets(Side::Enemy).is_empty()
        {
            AttackBranch::Return
        } else if board.in_home_territory(board.own_position()) {
            AttackBranch::AttackFromHome
        } else {
            AttackBranch::AttackInEnemyField
        }
    }

    fn update_counters(&mut self, board: &dyn BoardOracle) {
        let here = board.own_position();
        let state = &mut self.state;

        state.turn += 1;
        state.forced_flee = state.forced_flee.saturating_sub(1);

        if state.capsule_effect > 0 {
            state.capsule_effect -= 1;
            debug!("Attacker: capsule effect active, remaining turns: {}", state.capsule_effect);
        }

        let capsules = board.capsules(Side::Enemy).len();
        if capsules < state.capsules_last_turn {
            state.capsule_effect = self.config.capsule_effect_duration;
            info!("Attacker: ate a capsule! remaining turns: {}", state.capsule_effect);
        }
        state.capsules_last_turn = capsules;

        if board.in_home_territory(here) {
            state.food_eaten = 0;
        } else {
            state.opening.clear();
        }

        if state.opening_planned && here == board.own_spawn() {
            info!("Attacker: respawned at {}, resetting opening and flee window", here);
            state.opening.clear();
            state.forced_flee = 0;
        }

        let targets = board.targets(Side::Enemy).len();
        if targets < state.targets_last_turn {
            state.food_eaten += 1;
            info!("Attacker: ate a pellet last turn, food eaten: {}", state.food_eaten);
        }
        state.targets_last_turn = targets;
    }

    fn heuristic(&self) -> impl Fn(Position, &dyn BoardOracle) -> u32 {
        attack_heuristic(self.config.flee_distance, self.config.enemy_close_cost)
    }

    /// First move toward `goal` through collision avoidance, `Stop` without a route
    fn step_towards(&self, board: &dyn BoardOracle, goal: Position, rng: &mut dyn RandomSource) -> Move {
        let here = board.own_position();
        best_first_search(board, here, goal, self.heuristic())
            .and_then(|route| route.first_move())
            .map(|mv| avoid_collision(board, here, mv, rng))
            .unwrap_or(Move::Stop)
    }

    fn decide_return(&mut self, board: &dyn BoardOracle, rng: &mut dyn RandomSource) -> Move {
        let here = board.own_position();
        let home = board.closest_home_cell();

        let enemy_close = board
            .visible_enemies()
            .into_iter()
            .any(|enemy| board.maze_distance(here, enemy) < self.config.flee_distance);

        if !enemy_close {
            let adjacent = board
                .targets(Side::Enemy)
                .into_iter()
                .filter(|&target| board.distance(here, target) == Some(1))
                .find_map(|target| Move::toward(here, target).map(|mv| (target, mv)));

            if let Some((target, mv)) = adjacent {
                info!(
                    "Attacker: ate {} pellets, returning home via a detour to {} with no enemies close",
                    self.state.food_eaten, target
                );
                return mv;
            }
        }

        info!(
            "Attacker: ate {} pellets, returning home to {:?}. Enemies close: {}",
            self.state.food_eaten, home, enemy_close
        );
        match home {
            Some(goal) => self.step_towards(board, goal, rng),
            None => Move::Stop,
        }
    }

    fn decide_attack_from_home(&mut self, board: &dyn BoardOracle, rng: &mut dyn RandomSource) -> Move {
        if self.state.opening.is_empty() && !self.state.opening_planned {
            self.state.opening_planned = true;
            let targets = board.targets(Side::Enemy);
            let selection = GoalSelection::RandomAmongClosest(self.config.opening_candidates);
            if let Some(route) = plan_to_closest(board, &targets, None, selection, self.heuristic(), rng) {
                info!("Attacker: start of match, heading to enemy pellet at {}", route.goal);
                self.state.opening = route.moves;
            }
        }

        if let Some(mv) = self.state.opening.pop_front() {
            return avoid_collision(board, board.own_position(), mv, rng);
        }

        self.decide_advance(board, rng)
    }

    fn decide_in_enemy_field(&mut self, board: &dyn BoardOracle, rng: &mut dyn RandomSource) -> Move {
        if self.state.capsule_effect == 0 {
            let here = board.own_position();
            let threat = board
                .threatening_enemies()
                .into_iter()
                .map(|enemy| board.maze_distance(here, enemy))
                .find(|&distance| distance < self.config.flee_distance);

            if let Some(distance) = threat {
                let home = board.closest_home_cell();
                info!("Attacker: fleeing from an enemy {} steps away, heading to {:?}", distance, home);
                self.record_flee();
                return match home {
                    Some(goal) => self.step_towards(board, goal, rng),
                    None => Move::Stop,
                };
            }
        }

        self.decide_advance(board, rng)
    }

    /// Attack behaviour once the opening is over
    fn decide_advance(&mut self, board: &dyn BoardOracle, rng: &mut dyn RandomSource) -> Move {
        let here = board.own_position();

        if self.state.forced_flee > 0 {
            if let Some(mut point) = self.state.rally_point {
                if point == here {
                    point = self.rally_point(board).unwrap_or(point);
                    self.state.rally_point = Some(point);
                }
                info!(
                    "Attacker: keep heading to rally point {} for {} more turns",
                    point, self.state.forced_flee
                );
                return self.step_towards(board, point, rng);
            }
        }

        if self.fleeing_too_much(board) {
            if board.targets(Side::Home).is_empty() {
                return Move::Stop;
            }

            if let Some(point) = self.rally_point(board) {
                self.state.rally_point = Some(point);
                self.state.forced_flee = self.config.forced_flee_turns;
                info!("Attacker: fled too often, regrouping at rally point {}", point);
                return self.step_towards(board, point, rng);
            }
        }

        let targets = board.targets(Side::Enemy);
        match plan_to_closest(board, &targets, None, GoalSelection::Closest, self.heuristic(), rng) {
            Some(route) => {
                info!("Attacker: going to closest enemy pellet at {}", route.goal);
                route
                    .first_move()
                    .map(|mv| avoid_collision(board, here, mv, rng))
                    .unwrap_or(Move::Stop)
            }
            None => Move::Stop,
        }
    }

    fn record_flee(&mut self) {
        self.state.flee_turns.push_back(self.state.turn);
        if self.state.flee_turns.len() > FLEE_HISTORY_CAP {
            self.state.flee_turns.pop_front();
        }
    }

    /// Whether the newest flee episodes are packed closely together
    ///
    /// Only evaluated at home, and at most once per newest episode.
    fn fleeing_too_much(&mut self, board: &dyn BoardOracle) -> bool {
        if !board.in_home_territory(board.own_position()) {
            return false;
        }

        let history = &self.state.flee_turns;
        if history.len() < MIN_FLEE_HISTORY {
            return false;
        }

        let newest = match history.back() {
            Some(&turn) => turn,
            None => return false,
        };
        if self.state.last_flee_checked == Some(newest) {
            return false;
        }

        let gaps = self.config.flee_cluster_gaps as usize;
        let recent: Vec<u32> = history.iter().rev().take(gaps + 1).copied().collect();
        let clustered = recent.len() == gaps + 1
            && recent
                .windows(2)
                .all(|pair| pair[0] - pair[1] <= self.config.flee_cluster_turns);

        self.state.last_flee_checked = Some(newest);
        clustered
    }

    /// Farther end of the column holding the home target closest to the enemy spawn
    fn rally_point(&self, board: &dyn BoardOracle) -> Option<Position> {
        let enemy_spawn = board.enemy_spawns().first().copied()?;
        let anchor = closest_target(board, enemy_spawn, &board.targets(Side::Home))?;
        let (bottom, top) = column_ends(board, anchor.x)?;

        let here = board.own_position();
        if board.maze_distance(here, bottom) > board.maze_distance(here, top) {
            Some(bottom)
        } else {
            Some(top)
        }
    }
}
