pub mod rest;
pub mod state;

pub use rest::{evaluate_handler, generate_case_handler, health_handler, next_case_handler};
