// Maze topology and the all-pairs distance table
//
// The maze never changes during a match, so distances are computed once per
// session with a breadth-first sweep from every open cell.

use std::collections::VecDeque;

use crate::types::{AgentInfo, Board, Game, GameState, Move, Position, Team};

const WALL: char = '%';
const FOOD: char = '.';
const CAPSULE: char = 'o';
const UNREACHABLE: u16 = u16::MAX;

/// Largest maze accepted; the distance table holds `cells * cells` entries
/// and every path stays shorter than `UNREACHABLE`
pub const MAX_CELLS: usize = 64 * 64;

/// Walls plus precomputed shortest-path distances between every pair of cells
#[derive(Debug, Clone)]
pub struct Layout {
    width: i32,
    height: i32,
    walls: Box<[bool]>,
    distances: Box<[u16]>,
}

impl Layout {
    /// Parses maze rows (north first) and precomputes the distance table
    ///
    /// # Returns
    /// * `Result<Layout, String>` - The layout, or an error for empty, ragged
    ///   or oversized mazes
    pub fn parse<S: AsRef<str>>(rows: &[S]) -> Result<Self, String> {
        let height = rows.len();
        if height == 0 {
            return Err("Maze has no rows".to_string());
        }

        let width = rows[0].as_ref().chars().count();
        if width == 0 {
            return Err("Maze rows are empty".to_string());
        }

        if width.saturating_mul(height) > MAX_CELLS {
            return Err(format!(
                "Maze is {}x{}, more than the {} cells supported",
                width, height, MAX_CELLS
            ));
        }

        let mut walls = vec![false; width * height];
        for (row_idx, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.chars().count() != width {
                return Err(format!(
                    "Maze row {} has {} cells, expected {}",
                    row_idx,
                    row.chars().count(),
                    width
                ));
            }

            // Row 0 is the northernmost row
            let y = height - 1 - row_idx;
            for (x, cell) in row.chars().enumerate() {
                walls[y * width + x] = cell == WALL;
            }
        }

        let mut layout = Layout {
            width: width as i32,
            height: height as i32,
            walls: walls.into_boxed_slice(),
            distances: Box::new([]),
        };
        layout.distances = layout.compute_distances();
        Ok(layout)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    fn index(&self, pos: Position) -> Option<usize> {
        if pos.x < 0 || pos.y < 0 || pos.x >= self.width || pos.y >= self.height {
            return None;
        }
        Some((pos.y * self.width + pos.x) as usize)
    }

    fn position(&self, index: usize) -> Position {
        let width = self.width as usize;
        Position::new((index % width) as i32, (index / width) as i32)
    }

    /// Out-of-bounds cells count as walls
    pub fn is_wall(&self, pos: Position) -> bool {
        self.index(pos).map_or(true, |idx| self.walls[idx])
    }

    /// Moves the match engine would accept from `pos`, `Stop` included
    pub fn legal_moves_from(&self, pos: Position) -> Vec<Move> {
        if self.is_wall(pos) {
            return vec![Move::Stop];
        }

        let mut moves: Vec<Move> = Move::cardinal()
            .into_iter()
            .filter(|mv| !self.is_wall(mv.apply(pos)))
            .collect();
        moves.push(Move::Stop);
        moves
    }

    /// True shortest-path distance, `None` when either cell is a wall or they are disconnected
    pub fn distance(&self, from: Position, to: Position) -> Option<u32> {
        let cells = self.walls.len();
        let a = self.index(from)?;
        let b = self.index(to)?;
        match self.distances[a * cells + b] {
            UNREACHABLE => None,
            d => Some(d as u32),
        }
    }

    fn compute_distances(&self) -> Box<[u16]> {
        let cells = self.walls.len();
        let mut distances = vec![UNREACHABLE; cells * cells];
        let mut queue = VecDeque::new();

        for source in 0..cells {
            if self.walls[source] {
                continue;
            }

            let row = &mut distances[source * cells..(source + 1) * cells];
            row[source] = 0;
            queue.push_back(source);

            while let Some(current) = queue.pop_front() {
                let next_distance = row[current].saturating_add(1);
                let pos = self.position(current);
                for mv in Move::cardinal() {
                    if let Some(n) = self.index(mv.apply(pos)) {
                        if !self.walls[n] && row[n] == UNREACHABLE {
                            row[n] = next_distance;
                            queue.push_back(n);
                        }
                    }
                }
            }
        }

        distances.into_boxed_slice()
    }
}

impl GameState {
    /// Builds a snapshot from a text layout in the classic capture format
    ///
    /// `%` walls, `.` food, `o` capsules, digits `1`-`4` spawn agents 0-3.
    /// Even-indexed agents play Red, odd-indexed agents play Blue. Every
    /// agent starts on its spawn and is visible.
    pub fn from_layout<S: AsRef<str>>(game_id: &str, rows: &[S], you: usize) -> Result<Self, String> {
        let layout = Layout::parse(rows)?;
        let height = layout.height();
        let mut food = Vec::new();
        let mut capsules = Vec::new();
        let mut agents = Vec::new();

        for (row_idx, row) in rows.iter().enumerate() {
            let y = height - 1 - row_idx as i32;
            for (x, cell) in row.as_ref().chars().enumerate() {
                let pos = Position::new(x as i32, y);
                match cell {
                    FOOD => food.push(pos),
                    CAPSULE => capsules.push(pos),
                    '1'..='4' => {
                        let index = cell as usize - '1' as usize;
                        let team = if index % 2 == 0 { Team::Red } else { Team::Blue };
                        agents.push(AgentInfo {
                            index,
                            team,
                            spawn: pos,
                            position: Some(pos),
                        });
                    }
                    _ => {}
                }
            }
        }
        agents.sort_by_key(|a| a.index);

        let state = GameState {
            game: Game {
                id: game_id.to_string(),
                timeout: 1000,
            },
            turn: 0,
            board: Board {
                maze: rows.iter().map(|r| r.as_ref().to_string()).collect(),
                food,
                capsules,
            },
            agents,
            you,
            role: None,
        };
        state.me()?;
        Ok(state)
    }
}
