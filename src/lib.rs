pub mod commands;
pub mod daemon;
pub mod fs;
pub mod models;
pub mod notify;
pub mod process;
pub mod registry;
pub mod watcher;

/// ASCII art logo for the vigil CLI
pub const LOGO: &str = "\
   ┬  ┬┬┌─┐┬┬
   └┐┌┘││ ┬││
    └┘ ┴└─┘┴┴─┘";
