//! CLI command handlers, one file per command.

mod add;
mod clear;
mod formats;
mod info;
mod remove;
mod run;
mod start;
mod status;

pub use add::run_add;
pub use clear::run_clear;
pub use formats::run_formats;
pub use info::run_info;
pub use remove::run_remove;
pub use run::run_queue;
pub use start::run_start;
pub use status::run_status;
