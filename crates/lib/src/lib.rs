//! Pet Store Assistant core library: turn orchestration, member greeting, the
//! classification seam, channels and the gateway, shared by the CLI.

pub mod bot;
pub mod channels;
pub mod classification;
pub mod config;
pub mod gateway;
pub mod llm;
