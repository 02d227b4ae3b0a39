// errors.rs — simulator failures
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("IO: {0}")] Io(#[from] std::io::Error),
    #[error("Parameter: {0}")] Parameter(String),
}
