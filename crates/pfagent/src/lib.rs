pub mod agent;
pub mod backend;
pub mod context;
pub mod errors;
pub mod factory;
pub mod models;
pub mod portfolio;
pub mod prompt_template;
pub mod providers;
pub mod session;
pub mod systems;
