use skugen::ErrorKind;
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Generation(#[from] skugen::Error),

    #[error("input error: {0}")]
    Input(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Generation(error) => match error.kind {
                ErrorKind::Validation => 2,
                ErrorKind::Configuration => 3,
                ErrorKind::Network | ErrorKind::RequestTimeout => 4,
                ErrorKind::Parse | ErrorKind::Shape => 5,
                ErrorKind::Abort => 130,
            },
            Self::Input(_) => 2,
            Self::Serialization(_) => 5,
            Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_follow_error_kind() {
        let code = |e: skugen::Error| CliError::from(e).exit_code();
        assert_eq!(code(skugen::Error::validation("x")), 2);
        assert_eq!(code(skugen::Error::configuration("x")), 3);
        assert_eq!(code(skugen::Error::from_http_status(503, "busy", "", None)), 4);
        assert_eq!(code(skugen::Error::shape("x")), 5);
        assert_eq!(code(skugen::Error::abort()), 130);
        assert_eq!(CliError::Input("x".into()).exit_code(), 2);
    }
}
