//! CLI command handlers, one per pipeline stage.

mod fetch;
mod preprocess;
mod run;
mod train;
mod visualize;

pub use fetch::run_fetch_command;
pub use preprocess::run_preprocess_command;
pub use run::run_pipeline_command;
pub use train::run_train_command;
pub use visualize::{run_browse_command, run_topic_clouds_command, run_wordcloud_command};
