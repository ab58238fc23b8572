pub mod cli;
pub mod core;
pub mod providers;
pub mod templates;
pub mod ui;
pub mod utils;
