#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("center has {len} components but the layout dimension is {dim}")]
    CenterDimension { dim: usize, len: usize },

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("graph contains an edge with a missing endpoint: {node}")]
    MissingEndpoint { node: String },
}

impl Error {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
