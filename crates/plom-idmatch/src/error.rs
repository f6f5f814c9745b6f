//! Error type shared by the matching core.

/// Errors produced while building or solving an ID-matching problem.
///
/// The variants fall in three classes: input-shape errors (the data handed to
/// the core is malformed), a lookup error (orchestration asked for a paper
/// without probability data) and the degenerate-problem error (nothing left
/// to match).
#[derive(Debug, Clone, PartialEq)]
pub enum MatchError {
    /// A student ID length does not match the number of digit distributions,
    /// or lengths are inconsistent within one table or roster.
    WrongLength {
        /// Length required by the rest of the input.
        expected: usize,
        /// Length actually supplied.
        got: usize,
    },
    /// A student ID is empty or contains something other than ASCII digits.
    InvalidStudentId {
        /// The rejected value.
        value: String,
    },
    /// A digit distribution does not hold exactly ten probabilities.
    BadDistribution {
        /// Digit position (left to right) of the offending distribution.
        position: usize,
        /// Number of entries found.
        len: usize,
    },
    /// A probability is not finite or lies outside `[0, 1]`.
    InvalidProbability {
        /// Digit position (left to right).
        position: usize,
        /// Digit value the probability belongs to.
        digit: usize,
        /// The rejected value.
        value: f64,
    },
    /// A paper was requested that has no probability data.
    MissingProbabilities {
        /// Paper number without data.
        paper_number: u32,
    },
    /// Zero papers or zero candidate IDs: there is nothing to match.
    DegenerateProblem {
        /// Number of papers with probability data.
        n_papers: usize,
        /// Number of unused candidate student IDs.
        n_ids: usize,
    },
    /// The cost matrix handed to a solver contains NaN or an infinity.
    NonFiniteCost {
        /// Row of the offending entry.
        row: usize,
        /// Column of the offending entry.
        col: usize,
    },
}

impl MatchError {
    /// `true` for the end-of-run case where no papers or no IDs are left.
    ///
    /// Orchestrating callers treat this as a normal stop, not a crash.
    pub fn is_degenerate(&self) -> bool {
        matches!(self, Self::DegenerateProblem { .. })
    }

    /// Stable snake_case code, used in reports and by the Python bindings.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::WrongLength { .. } => "wrong_length",
            Self::InvalidStudentId { .. } => "invalid_student_id",
            Self::BadDistribution { .. } => "bad_distribution",
            Self::InvalidProbability { .. } => "invalid_probability",
            Self::MissingProbabilities { .. } => "missing_probabilities",
            Self::DegenerateProblem { .. } => "degenerate_problem",
            Self::NonFiniteCost { .. } => "non_finite_cost",
        }
    }
}

impl std::fmt::Display for MatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WrongLength { expected, got } => {
                write!(f, "wrong length: expected {} digits, got {}", expected, got)
            }
            Self::InvalidStudentId { value } => {
                write!(f, "invalid student id {:?}: expected ASCII digits only", value)
            }
            Self::BadDistribution { position, len } => write!(
                f,
                "digit distribution at position {} has {} entries, expected 10",
                position, len
            ),
            Self::InvalidProbability {
                position,
                digit,
                value,
            } => write!(
                f,
                "invalid probability {} for digit {} at position {}",
                value, digit, position
            ),
            Self::MissingProbabilities { paper_number } => {
                write!(f, "no probability data for paper {}", paper_number)
            }
            Self::DegenerateProblem { n_papers, n_ids } => write!(
                f,
                "degenerate assignment problem: {} papers and {} student ids",
                n_papers, n_ids
            ),
            Self::NonFiniteCost { row, col } => {
                write!(f, "non-finite cost at row {}, column {}", row, col)
            }
        }
    }
}

impl std::error::Error for MatchError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_message_names_both_counts() {
        let err = MatchError::DegenerateProblem {
            n_papers: 0,
            n_ids: 12,
        };
        let msg = err.to_string();
        assert!(msg.contains("degenerate assignment problem"));
        assert!(msg.contains("0 papers"));
        assert!(msg.contains("12 student ids"));
        assert!(err.is_degenerate());
    }

    #[test]
    fn wrong_length_is_not_degenerate() {
        let err = MatchError::WrongLength {
            expected: 8,
            got: 7,
        };
        assert!(!err.is_degenerate());
        assert_eq!(err.code(), "wrong_length");
        assert!(err.to_string().starts_with("wrong length"));
    }
}
