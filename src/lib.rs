#![deny(clippy::all)]

pub mod config;
pub mod generator;
pub mod matcher;
pub mod order;
pub mod session;
pub mod timer;
pub mod trade;

pub mod seq;
