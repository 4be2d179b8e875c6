//! Agent state and the query loop

mod runner;
pub mod state;

pub use runner::{QueryOutcome, QueryRunner};
pub use state::AgentState;
