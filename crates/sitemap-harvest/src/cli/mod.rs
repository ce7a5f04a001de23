//! CLI subcommand implementations for the sitemap-harvest binary.

pub mod harvest_cmd;
pub mod logging;
pub mod output;
pub mod parse_cmd;
pub mod progress;
