use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("cannot read input document {path}: {reason}")]
    FatalInput { path: String, reason: String },

    #[error("no pages found containing marker '{marker}'")]
    NoMarkerFound { marker: String },

    #[error("invalid form profile: {0}")]
    InvalidProfile(String),
}

impl PipelineError {
    pub fn fatal_input(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FatalInput {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
