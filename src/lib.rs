// Core modules
pub mod cli;
pub mod config;
pub mod infrastructure;
pub mod rpc;

// Panel components
pub mod editor;
pub mod history;
pub mod rebase;
pub mod updates;
