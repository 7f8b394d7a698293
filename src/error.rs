use thiserror::Error;

pub type FootprintResult<T> = Result<T, FootprintError>;

#[derive(Debug, Error)]
pub enum FootprintError {
    #[error("invalid polygon: {message}")]
    InvalidPolygon { message: String },

    #[error("polygon decode error: {message}")]
    Decode { message: String },

    #[error("data id already present and allow_replace is disabled")]
    DuplicateDataId,

    #[error("data id codec error: {message}")]
    IdCodec { message: String },

    #[error("invalid init statement '{statement}': {message}")]
    InitStatement { statement: String, message: String },

    #[error("storage error: {source}")]
    Storage {
        #[from]
        source: rusqlite::Error,
    },
}

impl FootprintError {
    pub fn invalid_polygon(message: impl Into<String>) -> Self {
        Self::InvalidPolygon {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn id_codec(message: impl Into<String>) -> Self {
        Self::IdCodec {
            message: message.into(),
        }
    }

    pub fn init_statement(statement: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InitStatement {
            statement: statement.into(),
            message: message.into(),
        }
    }
}
