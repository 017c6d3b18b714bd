//! ccwrapped: yearly and monthly recaps of Claude Code usage

pub mod cli;
pub mod parsers;
pub mod services;
pub mod types;
