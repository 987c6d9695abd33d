// Library exports for the capture agents
// This allows the replay tool and the integration tests to use the core decision logic

pub mod agent;
pub mod attacker;
pub mod bot;
pub mod config;
pub mod debug_logger;
pub mod defender;
pub mod layout;
pub mod oracle;
pub mod planner;
pub mod random;
pub mod replay;
pub mod types;
