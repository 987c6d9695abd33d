// Shared helpers for integration tests
//
// A Scenario owns a parsed layout and the current snapshot for one agent.
// Moves are applied the way the match engine would apply them for that agent:
// the agent steps, eats anything on the enemy half it steps onto, and the
// turn counter advances.

#![allow(dead_code)]

use capture_agents::layout::Layout;
use capture_agents::oracle::TurnView;
use capture_agents::types::{GameState, Move, Position, Team};

pub struct Scenario {
    pub layout: Layout,
    pub state: GameState,
}

impl Scenario {
    pub fn new(rows: &[&str], you: usize) -> Self {
        let state = GameState::from_layout("test-match", rows, you).expect("valid layout");
        let layout = Layout::parse(&state.board.maze).expect("valid maze");
        Scenario { layout, state }
    }

    pub fn view(&self) -> TurnView<'_> {
        TurnView::new(&self.layout, &self.state).expect("valid snapshot")
    }

    pub fn position(&self) -> Position {
        self.state.me().expect("own agent").position.expect("own position")
    }

    /// Places (or hides, with `None`) any agent
    pub fn place(&mut self, agent: usize, position: Option<Position>) {
        let info = self
            .state
            .agents
            .iter_mut()
            .find(|a| a.index == agent)
            .expect("agent exists");
        info.position = position;
    }

    pub fn hide_enemies(&mut self) {
        let team = self.state.me().expect("own agent").team;
        for agent in self.state.agents.iter_mut().filter(|a| a.team != team) {
            agent.position = None;
        }
    }

    pub fn remove_item(&mut self, pos: Position) {
        self.state.board.food.retain(|p| *p != pos);
        self.state.board.capsules.retain(|p| *p != pos);
    }

    /// Steps our agent, eating enemy-half items, and advances the turn
    pub fn advance(&mut self, mv: Move) {
        let next = mv.apply(self.position());
        let you = self.state.you;
        self.place(you, Some(next));

        let team = self.state.me().expect("own agent").team;
        let midline = self.layout.width() / 2;
        let on_enemy_half = match team {
            Team::Red => next.x >= midline,
            Team::Blue => next.x < midline,
        };
        if on_enemy_half {
            self.remove_item(next);
        }
        self.state.turn += 1;
    }
}
