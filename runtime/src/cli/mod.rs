//! CLI subcommand implementations for the online-watch binary.

pub mod output;
pub mod run_cmd;
pub mod sites_cmd;
