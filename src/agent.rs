// One agent's policy, whichever role it plays

use crate::attacker::AttackPolicy;
use crate::config::Config;
use crate::defender::DefendPolicy;
use crate::oracle::BoardOracle;
use crate::random::RandomSource;
use crate::types::{Move, Role};

pub enum Agent {
    Attacker(AttackPolicy),
    Defender(DefendPolicy),
}

impl Agent {
    /// Builds the policy for `role` from the first observation of the board
    pub fn new(role: Role, config: &Config, board: &dyn BoardOracle) -> Self {
        match role {
            Role::Attacker => Agent::Attacker(AttackPolicy::new(config.attacker.clone(), board)),
            Role::Defender => Agent::Defender(DefendPolicy::new(config.defender.clone(), board)),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Agent::Attacker(_) => Role::Attacker,
            Agent::Defender(_) => Role::Defender,
        }
    }

    pub fn choose_move(&mut self, board: &dyn BoardOracle, rng: &mut dyn RandomSource) -> Move {
        match self {
            Agent::Attacker(policy) => policy.choose_move(board, rng),
            Agent::Defender(policy) => policy.choose_move(board, rng),
        }
    }
}
