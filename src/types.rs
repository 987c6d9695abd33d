// Capture game API types
// One snapshot is posted by the match engine per agent per turn

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Match metadata
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Game {
    pub id: String,
    #[serde(default)]
    pub timeout: u32,
}

/// Maze and the items still lying on it
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Board {
    /// Maze rows from north to south; '%' marks a wall, anything else is open
    pub maze: Vec<String>,
    pub food: Vec<Position>,
    pub capsules: Vec<Position>,
}

/// 2D coordinate on the maze, `y` grows northwards
#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Position { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Team {
    Red,
    Blue,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Attacker,
    Defender,
}

/// Per-agent view published by the match engine
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct AgentInfo {
    pub index: usize,
    pub team: Team,
    pub spawn: Position,
    /// `None` when the agent is out of sight
    #[serde(default)]
    pub position: Option<Position>,
}

/// The five actions an agent may take in a turn
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    North,
    South,
    East,
    West,
    Stop,
}

impl Move {
    /// The four moves that change the agent's cell
    pub fn cardinal() -> [Move; 4] {
        [Move::North, Move::South, Move::East, Move::West]
    }

    /// Converts the move to the string the match engine expects
    pub fn as_str(&self) -> &'static str {
        match self {
            Move::North => "North",
            Move::South => "South",
            Move::East => "East",
            Move::West => "West",
            Move::Stop => "Stop",
        }
    }

    pub fn delta(&self) -> (i32, i32) {
        match self {
            Move::North => (0, 1),
            Move::South => (0, -1),
            Move::East => (1, 0),
            Move::West => (-1, 0),
            Move::Stop => (0, 0),
        }
    }

    /// Calculates the cell reached when moving from `pos`
    pub fn apply(&self, pos: Position) -> Position {
        let (dx, dy) = self.delta();
        Position::new(pos.x + dx, pos.y + dy)
    }

    pub fn reverse(&self) -> Move {
        match self {
            Move::North => Move::South,
            Move::South => Move::North,
            Move::East => Move::West,
            Move::West => Move::East,
            Move::Stop => Move::Stop,
        }
    }

    /// The single cardinal move leading from `from` to an adjacent `to`
    pub fn toward(from: Position, to: Position) -> Option<Move> {
        Move::cardinal().into_iter().find(|mv| mv.apply(from) == to)
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Move {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "north" => Ok(Move::North),
            "south" => Ok(Move::South),
            "east" => Ok(Move::East),
            "west" => Ok(Move::West),
            "stop" => Ok(Move::Stop),
            _ => Err(format!("Invalid move: {}", s)),
        }
    }
}

/// Complete turn snapshot received from the match engine
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct GameState {
    pub game: Game,
    pub turn: i32,
    pub board: Board,
    pub agents: Vec<AgentInfo>,
    /// Index of the agent this snapshot is addressed to
    pub you: usize,
    /// Explicit role assignment; derived from the team layout when absent
    #[serde(default)]
    pub role: Option<Role>,
}

impl GameState {
    pub fn agent(&self, index: usize) -> Option<&AgentInfo> {
        self.agents.iter().find(|a| a.index == index)
    }

    /// The agent this snapshot is addressed to
    pub fn me(&self) -> Result<&AgentInfo, String> {
        self.agent(self.you)
            .ok_or_else(|| format!("Agent {} not found in snapshot", self.you))
    }

    pub fn opponents(&self) -> Result<Vec<&AgentInfo>, String> {
        let team = self.me()?.team;
        Ok(self.agents.iter().filter(|a| a.team != team).collect())
    }

    /// Explicit role, or Attacker for the lowest index on the team and Defender otherwise
    pub fn resolve_role(&self) -> Result<Role, String> {
        if let Some(role) = self.role {
            return Ok(role);
        }

        let me = self.me()?;
        let lowest = self
            .agents
            .iter()
            .filter(|a| a.team == me.team)
            .map(|a| a.index)
            .min()
            .unwrap_or(me.index);

        Ok(if me.index == lowest {
            Role::Attacker
        } else {
            Role::Defender
        })
    }
}
