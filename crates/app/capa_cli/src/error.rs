use thiserror::Error;

use capa_core::api::ApiError;
use capa_core::schema::SchemaError;
use capa_core::schema::compiler::CompileError;
use capa_mcp::tools::call::ToolCallError;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{}", .0)]
    Custom(String),

    #[error("IO::{:?}: {}", .0, .0)]
    Io(#[from] std::io::Error),

    #[error("FlexiLogger::{:?}: {}", .0, .0)]
    FlexiLogger(#[from] flexi_logger::FlexiLoggerError),

    #[error("Json: {}", .0)]
    Json(#[from] serde_json::Error),

    #[error("{}", .0)]
    Schema(#[from] SchemaError),

    #[error("{}", .0)]
    Compile(#[from] CompileError),

    #[error("{}", .0)]
    Api(#[from] ApiError),

    #[error("{}", .0)]
    ToolCall(#[from] ToolCallError),

    #[error("Invalid input: {}", .0.join(", "))]
    Validation(Vec<String>),
}
