use td_component::ComponentError;
use td_config::ConfigError;
use td_controls::ControlError;
use td_tasks::TaskError;

pub type CliResult<T> = Result<T, CliError>;

#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    #[error("Control error: {0}")]
    Control(#[from] ControlError),

    #[error("Component error: {0}")]
    Component(#[from] ComponentError),

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}
