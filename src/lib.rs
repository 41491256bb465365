pub mod cli;
pub mod config;
pub mod filter;
pub mod sequencer;
pub mod source;
pub mod upstream;
pub mod web;
