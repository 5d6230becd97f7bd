//! Pong Server - authoritative two-player game server
//!
//! Players connect over WebSocket, are paired first-come first-served, and
//! receive the ball state from a per-match physics loop.

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod matchmaking;
pub mod util;
pub mod ws;
