// error.rs - Error taxonomy for maze configuration and generation

use thiserror::Error;

use crate::grid::MemorySize;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MazeError {
    #[error("Parameter out of bounds. Use a value between [{min} and {max}].")]
    ParameterOutOfRange {
        parameter: &'static str,
        value: u64,
        min: u32,
        max: u32,
    },

    #[error("The labyrinth you have chosen requires {required} of RAM. (Max={maximum}.)")]
    MemoryBudgetExceeded {
        required: MemorySize,
        maximum: MemorySize,
    },

    #[error("Generation produced no usable path (best distance {best_distance})")]
    GenerationDegenerate { best_distance: usize },

    #[error("Generation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, MazeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_match_protocol_text() {
        let err = MazeError::ParameterOutOfRange {
            parameter: "width",
            value: 16,
            min: 32,
            max: 65536,
        };
        assert_eq!(
            err.to_string(),
            "Parameter out of bounds. Use a value between [32 and 65536]."
        );

        let err = MazeError::MemoryBudgetExceeded {
            required: MemorySize(4096 * 4096 * 2),
            maximum: MemorySize(16 * 1024 * 1024),
        };
        assert_eq!(
            err.to_string(),
            "The labyrinth you have chosen requires 32MB of RAM. (Max=16MB.)"
        );
    }
}
