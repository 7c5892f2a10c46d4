use thiserror::Error;

pub type TdResult<T> = Result<T, TdError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TdError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },
}
