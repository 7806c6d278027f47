pub mod agents;
pub mod config;
pub mod console;
pub mod dashboard;
pub mod extract;
pub mod gemini;
pub mod orchestrator;
pub mod types;
