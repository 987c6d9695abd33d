// Board Oracle: the read-only query surface the policies consult every turn
//
// `TurnView` answers the queries from one snapshot plus the match's
// precomputed `Layout`. Policies only ever see `&dyn BoardOracle`.

use crate::layout::Layout;
use crate::types::{AgentInfo, GameState, Move, Position, Team};

/// Which half of the maze an item belongs to, relative to the asking agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The half the agent's team defends
    Home,
    /// The half the agent's team raids
    Enemy,
}

pub trait BoardOracle {
    fn width(&self) -> i32;
    fn height(&self) -> i32;
    fn is_wall(&self, pos: Position) -> bool;

    /// True shortest-path distance, `None` when unreachable
    fn distance(&self, from: Position, to: Position) -> Option<u32>;

    /// Legal moves from a hypothetical position, `Stop` included
    fn legal_moves_from(&self, pos: Position) -> Vec<Move>;

    fn team(&self) -> Team;
    fn turn(&self) -> i32;
    fn own_position(&self) -> Position;
    fn own_spawn(&self) -> Position;

    /// One entry per opponent, `None` for those out of sight
    fn enemy_positions(&self) -> Vec<Option<Position>>;
    fn enemy_spawns(&self) -> Vec<Position>;

    fn food(&self, side: Side) -> Vec<Position>;
    fn capsules(&self, side: Side) -> Vec<Position>;

    fn legal_moves(&self) -> Vec<Move> {
        self.legal_moves_from(self.own_position())
    }

    /// Distance that sorts unreachable cells last
    fn maze_distance(&self, from: Position, to: Position) -> u32 {
        self.distance(from, to).unwrap_or(u32::MAX)
    }

    fn in_home_territory(&self, pos: Position) -> bool {
        let midline = self.width() / 2;
        match self.team() {
            Team::Red => pos.x < midline,
            Team::Blue => pos.x >= midline,
        }
    }

    fn visible_enemies(&self) -> Vec<Position> {
        self.enemy_positions().into_iter().flatten().collect()
    }

    /// Visible enemies standing on their own half, where they can capture us
    fn threatening_enemies(&self) -> Vec<Position> {
        self.visible_enemies()
            .into_iter()
            .filter(|pos| !self.in_home_territory(*pos))
            .collect()
    }

    /// Food followed by capsules on the given side
    fn targets(&self, side: Side) -> Vec<Position> {
        let mut targets = self.food(side);
        targets.extend(self.capsules(side));
        targets
    }

    /// Open cells of column `x`, bottom to top, skipping the bottom border row
    fn column_cells(&self, x: i32) -> Vec<Position> {
        (1..self.height())
            .map(|y| Position::new(x, y))
            .filter(|pos| !self.is_wall(*pos))
            .collect()
    }

    /// The column of home territory that touches the midline
    fn home_border_column(&self) -> i32 {
        let midline = self.width() / 2;
        match self.team() {
            Team::Red => midline - 1,
            Team::Blue => midline,
        }
    }

    /// Nearest reachable cell of the home border column
    fn closest_home_cell(&self) -> Option<Position> {
        let here = self.own_position();
        self.column_cells(self.home_border_column())
            .into_iter()
            .filter_map(|pos| self.distance(here, pos).map(|d| (d, pos)))
            .min_by_key(|(d, _)| *d)
            .map(|(_, pos)| pos)
    }
}

/// Board Oracle over a single turn snapshot
pub struct TurnView<'a> {
    layout: &'a Layout,
    state: &'a GameState,
    me: &'a AgentInfo,
    position: Position,
}

impl<'a> TurnView<'a> {
    /// Validates the snapshot against the layout
    ///
    /// # Returns
    /// * `Result<TurnView, String>` - Fails when the addressed agent is unknown,
    ///   has no position, or stands inside a wall
    pub fn new(layout: &'a Layout, state: &'a GameState) -> Result<Self, String> {
        let me = state.me()?;
        let position = me
            .position
            .ok_or_else(|| format!("Agent {} has no position in its own snapshot", me.index))?;

        if layout.is_wall(position) {
            return Err(format!("Agent {} is inside a wall at {}", me.index, position));
        }

        Ok(TurnView {
            layout,
            state,
            me,
            position,
        })
    }

    fn opponents(&self) -> impl Iterator<Item = &'a AgentInfo> + '_ {
        let team = self.me.team;
        self.state.agents.iter().filter(move |a| a.team != team)
    }

    fn on_side(&self, items: &[Position], side: Side) -> Vec<Position> {
        items
            .iter()
            .copied()
            .filter(|pos| self.in_home_territory(*pos) == (side == Side::Home))
            .collect()
    }
}

impl BoardOracle for TurnView<'_> {
    fn width(&self) -> i32 {
        self.layout.width()
    }

    fn height(&self) -> i32 {
        self.layout.height()
    }

    fn is_wall(&self, pos: Position) -> bool {
        self.layout.is_wall(pos)
    }

    fn distance(&self, from: Position, to: Position) -> Option<u32> {
        self.layout.distance(from, to)
    }

    fn legal_moves_from(&self, pos: Position) -> Vec<Move> {
        self.layout.legal_moves_from(pos)
    }

    fn team(&self) -> Team {
        self.me.team
    }

    fn turn(&self) -> i32 {
        self.state.turn
    }

    fn own_position(&self) -> Position {
        self.position
    }

    fn own_spawn(&self) -> Position {
        self.me.spawn
    }

    fn enemy_positions(&self) -> Vec<Option<Position>> {
        self.opponents().map(|a| a.position).collect()
    }

    fn enemy_spawns(&self) -> Vec<Position> {
        self.opponents().map(|a| a.spawn).collect()
    }

    fn food(&self, side: Side) -> Vec<Position> {
        self.on_side(&self.state.board.food, side)
    }

    fn capsules(&self, side: Side) -> Vec<Position> {
        self.on_side(&self.state.board.capsules, side)
    }
}
