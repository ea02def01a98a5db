pub mod install_cmd;
pub mod output;
pub mod prompt;
pub mod run_cmd;
pub mod status_cmd;
pub mod test_cmd;
