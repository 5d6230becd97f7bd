//! Matchmaking - FIFO pairing of players into sessions

pub mod registry;

pub use registry::{MatchmakingRegistry, Seating};
