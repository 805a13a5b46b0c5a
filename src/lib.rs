pub mod app;
pub mod controller;
pub mod error;
pub mod fsm;
pub mod input;
pub mod planner;
pub mod protocol;
pub mod transport;
