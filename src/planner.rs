// Route planner shared by both policies
//
// A best-first search over single-step moves whose per-cell cost is supplied
// by the calling policy, a closest-target wrapper around it, and the
// collision-avoidance filter every chosen step goes through.

use log::{debug, info};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use crate::oracle::BoardOracle;
use crate::random::{choose, RandomSource};
use crate::types::{Move, Position};

const STEP_COST: u32 = 1;

/// Planned moves toward a goal cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub goal: Position,
    pub moves: VecDeque<Move>,
}

impl Route {
    pub fn first_move(&self) -> Option<Move> {
        self.moves.front().copied()
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

/// How the closest-target wrapper picks among ranked candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalSelection {
    Closest,
    /// Uniformly among the `n` closest
    RandomAmongClosest(usize),
}

/// Cost of one step plus no extra penalty; yields true shortest paths
pub fn uniform_cost(_pos: Position, _board: &dyn BoardOracle) -> u32 {
    1
}

struct SearchNode {
    position: Position,
    moves: Vec<Move>,
    cost: u32,
}

/// Min-priority queue holding at most one live node per position
///
/// Replaced nodes leave stale heap entries behind; `pop` skips them.
#[derive(Default)]
struct Frontier {
    heap: BinaryHeap<Reverse<(u32, u64, Position)>>,
    live: HashMap<Position, SearchNode>,
    sequence: u64,
}

impl Frontier {
    /// Inserts `node`, or replaces the queued node for its position when `node` is cheaper
    fn update(&mut self, node: SearchNode) {
        if let Some(queued) = self.live.get(&node.position) {
            if queued.cost <= node.cost {
                return;
            }
        }

        // The sequence number keeps equal keys in insertion order
        self.heap
            .push(Reverse((node.cost, self.sequence, node.position)));
        self.sequence += 1;
        self.live.insert(node.position, node);
    }

    fn pop(&mut self) -> Option<SearchNode> {
        while let Some(Reverse((cost, _, position))) = self.heap.pop() {
            let current = self.live.get(&position).map(|node| node.cost);
            if current == Some(cost) {
                return self.live.remove(&position);
            }
        }
        None
    }
}

/// Best-first search from `start` to `goal`
///
/// Each successor is keyed by `cost_so_far + 1 + heuristic(successor)` and
/// that key becomes its accumulated cost, so a penalising heuristic steers the
/// whole route away from penalised cells. `Stop` is never expanded.
///
/// # Returns
/// * `Option<Route>` - The move sequence, or `None` when the goal is unreachable
pub fn best_first_search<H>(
    board: &dyn BoardOracle,
    start: Position,
    goal: Position,
    heuristic: H,
) -> Option<Route>
where
    H: Fn(Position, &dyn BoardOracle) -> u32,
{
    let mut frontier = Frontier::default();
    let mut visited = HashSet::new();

    frontier.update(SearchNode {
        position: start,
        moves: Vec::new(),
        cost: 0,
    });

    while let Some(node) = frontier.pop() {
        if node.position == goal {
            return Some(Route {
                goal,
                moves: node.moves.into(),
            });
        }

        if !visited.insert(node.position) {
            continue;
        }

        for mv in board.legal_moves_from(node.position) {
            if mv == Move::Stop {
                continue;
            }

            let successor = mv.apply(node.position);
            if visited.contains(&successor) {
                continue;
            }

            let cost = node
                .cost
                .saturating_add(STEP_COST)
                .saturating_add(heuristic(successor, board));
            let mut moves = node.moves.clone();
            moves.push(mv);

            frontier.update(SearchNode {
                position: successor,
                moves,
                cost,
            });
        }
    }

    debug!("No route from {} to {}", start, goal);
    None
}

/// Candidates reachable from `origin`, nearest first (stable for ties)
pub fn rank_by_distance(
    board: &dyn BoardOracle,
    origin: Position,
    candidates: &[Position],
) -> Vec<(u32, Position)> {
    let mut ranked: Vec<(u32, Position)> = candidates
        .iter()
        .filter_map(|&pos| board.distance(origin, pos).map(|d| (d, pos)))
        .collect();
    ranked.sort_by_key(|(d, _)| *d);
    ranked
}

/// The candidate nearest to `origin`
pub fn closest_target(
    board: &dyn BoardOracle,
    origin: Position,
    candidates: &[Position],
) -> Option<Position> {
    rank_by_distance(board, origin, candidates)
        .first()
        .map(|(_, pos)| *pos)
}

/// Picks a goal among `candidates` ranked by distance from `origin`
/// (the agent's own position when `None`)
pub fn select_goal(
    board: &dyn BoardOracle,
    candidates: &[Position],
    origin: Option<Position>,
    selection: GoalSelection,
    rng: &mut dyn RandomSource,
) -> Option<Position> {
    let origin = origin.unwrap_or_else(|| board.own_position());
    let ranked = rank_by_distance(board, origin, candidates);

    match selection {
        GoalSelection::Closest => ranked.first().map(|(_, pos)| *pos),
        GoalSelection::RandomAmongClosest(n) => {
            let top = &ranked[..ranked.len().min(n.max(1))];
            choose(rng, top).map(|(_, pos)| *pos)
        }
    }
}

/// Selects a goal among `candidates` and plans to it from the agent's real position
pub fn plan_to_closest<H>(
    board: &dyn BoardOracle,
    candidates: &[Position],
    origin: Option<Position>,
    selection: GoalSelection,
    heuristic: H,
    rng: &mut dyn RandomSource,
) -> Option<Route>
where
    H: Fn(Position, &dyn BoardOracle) -> u32,
{
    let goal = select_goal(board, candidates, origin, selection, rng)?;
    best_first_search(board, board.own_position(), goal, heuristic)
}

/// Bottom and top open cells of column `x`
pub fn column_ends(board: &dyn BoardOracle, x: i32) -> Option<(Position, Position)> {
    let cells = board.column_cells(x);
    Some((*cells.first()?, *cells.last()?))
}

/// Overrides `proposed` when it steps next to a visible enemy on its own half
///
/// Cells within maze distance 1 of such an enemy are unsafe. An unsafe
/// proposal is swapped for a random safe legal move; with no safe move left
/// the proposal is returned unchanged.
pub fn avoid_collision(
    board: &dyn BoardOracle,
    current: Position,
    proposed: Move,
    rng: &mut dyn RandomSource,
) -> Move {
    let threats = board.threatening_enemies();
    if threats.is_empty() {
        return proposed;
    }

    let is_safe = |pos: Position| threats.iter().all(|&enemy| board.maze_distance(pos, enemy) > 1);

    if is_safe(proposed.apply(current)) {
        return proposed;
    }

    let safe: Vec<Move> = board
        .legal_moves_from(current)
        .into_iter()
        .filter(|&mv| mv != Move::Stop && is_safe(mv.apply(current)))
        .collect();

    match choose(rng, &safe) {
        Some(&alternative) => {
            info!(
                "Route led {} towards an enemy at {:?}, taking {} instead",
                proposed, threats, alternative
            );
            alternative
        }
        None => proposed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Layout;
    use crate::oracle::TurnView;
    use crate::random::FixedPick;
    use crate::types::GameState;

    const LOOP: [&str; 6] = [
        "%%%%%%%%",
        "%1     %",
        "% %%%% %",
        "% %%%% %",
        "%     2%",
        "%%%%%%%%",
    ];

    fn walk(start: Position, route: &Route) -> Position {
        route.moves.iter().fold(start, |pos, mv| mv.apply(pos))
    }

    #[test]
    fn test_frontier_keeps_cheapest_node_per_position() {
        let mut frontier = Frontier::default();
        let pos = Position::new(1, 1);
        let node = |cost| SearchNode {
            position: pos,
            moves: Vec::new(),
            cost,
        };

        frontier.update(node(5));
        frontier.update(node(7));
        frontier.update(node(3));
        frontier.update(node(3));

        let popped = frontier.pop().unwrap();
        assert_eq!(popped.cost, 3);
        assert!(frontier.pop().is_none());
    }

    #[test]
    fn test_frontier_pops_equal_keys_in_insertion_order() {
        let mut frontier = Frontier::default();
        for x in [3, 1, 2] {
            frontier.update(SearchNode {
                position: Position::new(x, 0),
                moves: Vec::new(),
                cost: 4,
            });
        }
        let order: Vec<i32> = std::iter::from_fn(|| frontier.pop())
            .map(|n| n.position.x)
            .collect();
        assert_eq!(order, vec![3, 1, 2]);
    }

    #[test]
    fn test_uniform_search_matches_maze_distance() {
        let state = GameState::from_layout("g", &LOOP, 0).unwrap();
        let layout = Layout::parse(&state.board.maze).unwrap();
        let view = TurnView::new(&layout, &state).unwrap();

        let start = Position::new(1, 4);
        for goal in [Position::new(6, 1), Position::new(6, 4), Position::new(1, 1), start] {
            let route = best_first_search(&view, start, goal, uniform_cost).unwrap();
            assert_eq!(route.len() as u32, layout.distance(start, goal).unwrap());
            assert_eq!(walk(start, &route), goal);
        }
    }

    #[test]
    fn test_penalty_steers_route_around_cells() {
        let state = GameState::from_layout("g", &LOOP, 0).unwrap();
        let layout = Layout::parse(&state.board.maze).unwrap();
        let view = TurnView::new(&layout, &state).unwrap();
        let start = Position::new(1, 4);
        let goal = Position::new(6, 1);

        // Penalise the northern corridor heavily: the route must go south first
        let avoid_north = |pos: Position, _: &dyn BoardOracle| if pos.y == 4 { 50 } else { 1 };
        let route = best_first_search(&view, start, goal, avoid_north).unwrap();
        assert_eq!(route.first_move(), Some(Move::South));
        assert_eq!(walk(start, &route), goal);

        let avoid_west = |pos: Position, _: &dyn BoardOracle| if pos.x == 1 { 50 } else { 1 };
        let route = best_first_search(&view, start, goal, avoid_west).unwrap();
        assert_eq!(route.first_move(), Some(Move::East));
    }

    #[test]
    fn test_unreachable_goal_returns_none() {
        let rows = ["%%%%%%", "%1%  %", "%%%%2%", "%%%%%%"];
        let state = GameState::from_layout("g", &rows, 0).unwrap();
        let layout = Layout::parse(&state.board.maze).unwrap();
        let view = TurnView::new(&layout, &state).unwrap();

        assert!(best_first_search(&view, Position::new(1, 2), Position::new(3, 2), uniform_cost).is_none());
    }

    #[test]
    fn test_random_selection_stays_within_closest_three() {
        let state = GameState::from_layout("g", &LOOP, 0).unwrap();
        let layout = Layout::parse(&state.board.maze).unwrap();
        let view = TurnView::new(&layout, &state).unwrap();

        // Distances from (1,4): 1, 2, 3, 4, 5
        let candidates: Vec<Position> = (2..=6).rev().map(|x| Position::new(x, 4)).collect();
        for index in 0..5 {
            let goal = select_goal(
                &view,
                &candidates,
                None,
                GoalSelection::RandomAmongClosest(3),
                &mut FixedPick(index),
            )
            .unwrap();
            assert!(goal.x <= 4, "picked {} outside the three closest", goal);
        }

        let closest = select_goal(&view, &candidates, None, GoalSelection::Closest, &mut FixedPick(2));
        assert_eq!(closest, Some(Position::new(2, 4)));
    }

    #[test]
    fn test_alternate_origin_changes_the_selected_goal() {
        let state = GameState::from_layout("g", &LOOP, 0).unwrap();
        let layout = Layout::parse(&state.board.maze).unwrap();
        let view = TurnView::new(&layout, &state).unwrap();
        let candidates = [Position::new(2, 4), Position::new(5, 1)];

        let route = plan_to_closest(
            &view,
            &candidates,
            Some(Position::new(6, 1)),
            GoalSelection::Closest,
            uniform_cost,
            &mut FixedPick(0),
        )
        .unwrap();
        assert_eq!(route.goal, Position::new(5, 1));
        assert_eq!(walk(view.own_position(), &route), Position::new(5, 1));
    }

    #[test]
    fn test_collision_filter_swaps_move_next_to_enemy() {
        // Red attacker at (5,4) on Blue's side; enemy waiting at (6,3)
        let mut state = GameState::from_layout("g", &LOOP, 0).unwrap();
        state.agents[0].position = Some(Position::new(5, 4));
        state.agents[1].position = Some(Position::new(6, 3));
        let layout = Layout::parse(&state.board.maze).unwrap();
        let view = TurnView::new(&layout, &state).unwrap();

        // East lands on (6,4), adjacent to the enemy; West is the only safe step
        let chosen = avoid_collision(&view, Position::new(5, 4), Move::East, &mut FixedPick(0));
        assert_eq!(chosen, Move::West);

        // A safe proposal is kept
        let kept = avoid_collision(&view, Position::new(5, 4), Move::West, &mut FixedPick(0));
        assert_eq!(kept, Move::West);
    }

    #[test]
    fn test_collision_filter_ignores_enemies_on_our_half() {
        let mut state = GameState::from_layout("g", &LOOP, 0).unwrap();
        state.agents[0].position = Some(Position::new(2, 4));
        state.agents[1].position = Some(Position::new(3, 4));
        let layout = Layout::parse(&state.board.maze).unwrap();
        let view = TurnView::new(&layout, &state).unwrap();

        let chosen = avoid_collision(&view, Position::new(2, 4), Move::East, &mut FixedPick(0));
        assert_eq!(chosen, Move::East);
    }

    #[test]
    fn test_collision_filter_keeps_proposal_when_cornered() {
        let rows = ["%%%%%%%%", "%  1 2 %", "%%%%%%%%"];
        let mut state = GameState::from_layout("g", &rows, 0).unwrap();
        state.agents[0].position = Some(Position::new(6, 1));
        state.agents[1].position = Some(Position::new(5, 1));
        let layout = Layout::parse(&state.board.maze).unwrap();
        let view = TurnView::new(&layout, &state).unwrap();

        let chosen = avoid_collision(&view, Position::new(6, 1), Move::West, &mut FixedPick(0));
        assert_eq!(chosen, Move::West);
    }
}
