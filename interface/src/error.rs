use std::io;
use std::path::PathBuf;

use brain::{LoopConfigError, StartupError};
use kinematics::ParamsError;
use thiserror::Error;

use crate::input::InputError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to read config {path}: {source}")]
    ConfigIo { path: PathBuf, source: io::Error },
    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Config(String),
    #[error("invalid trajectory: {0}")]
    Params(#[from] ParamsError),
    #[error(transparent)]
    Loop(#[from] LoopConfigError),
    #[error("keyboard input unavailable: {0}")]
    Input(#[from] InputError),
    #[error("failed to open zenoh session: {0}")]
    Session(String),
    #[error("startup failed: {0}")]
    Startup(#[from] StartupError),
}
