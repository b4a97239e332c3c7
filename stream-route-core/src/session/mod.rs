mod control;
pub mod engine;
mod lifecycle;
mod reactor;
