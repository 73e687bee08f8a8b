//! Hole-in-One - mini-golf physics core and online match authority
//!
//! - `game`: course generation, ball physics, collisions and the round state
//!   machine shared by every play mode
//! - `sync`: client mirror of an online match
//! - `ws::protocol`: JSON wire messages
//! - `game::r#match` and `matchmaking`: the authoritative server side

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod matchmaking;
pub mod sync;
pub mod util;
pub mod ws;
