/// Errors that can occur while building a frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// A command argument is outside the range the protocol can carry.
    #[error("{name} must be between {min} and {max} (got {value})")]
    InvalidParameter {
        name: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
}

pub type Result<T> = std::result::Result<T, FrameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_parameter_display_names_the_argument() {
        let err = FrameError::InvalidParameter {
            name: "brightness",
            value: 101,
            min: 0,
            max: 100,
        };
        assert_eq!(err.to_string(), "brightness must be between 0 and 100 (got 101)");
    }
}
