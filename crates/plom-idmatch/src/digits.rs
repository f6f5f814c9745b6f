//! Typed inputs: student IDs, per-digit probability vectors and the
//! per-paper probability table.
//!
//! The digit-recognition model hands over one probability distribution over
//! the digits 0-9 for every position of the ID box. These types check the
//! shape of that data once, at construction, so the cost and solver stages
//! only ever see well-formed input.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::MatchError;

/// Slack allowed above 1.0 for probabilities coming out of a softmax.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// One distribution over the digits 0-9 (index = digit value).
pub type DigitDistribution = [f64; 10];

/// A student ID: a non-empty string of ASCII decimal digits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StudentId(String);

impl StudentId {
    /// Validate and wrap a student ID string.
    pub fn new(value: impl Into<String>) -> Result<Self, MatchError> {
        let value = value.into();
        if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MatchError::InvalidStudentId { value });
        }
        Ok(Self(value))
    }

    /// Number of digits `D`.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; construction rejects empty IDs.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Digit values, left to right.
    pub fn digits(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.bytes().map(|b| usize::from(b - b'0'))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StudentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for StudentId {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for StudentId {
    type Error = MatchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StudentId> for String {
    fn from(id: StudentId) -> Self {
        id.0
    }
}

/// Per-digit probability distributions read from one paper's ID box.
///
/// Position `k` holds the distribution for the `k`-th digit from the left.
/// Rows are not required to sum to one, but every value must be a finite
/// probability.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct DigitProbs {
    digits: Vec<DigitDistribution>,
}

impl DigitProbs {
    /// Wrap fixed-size distributions, validating every value.
    pub fn new(digits: Vec<DigitDistribution>) -> Result<Self, MatchError> {
        for (position, dist) in digits.iter().enumerate() {
            validate_distribution(position, dist)?;
        }
        Ok(Self { digits })
    }

    /// Build from loosely shaped rows (JSON, Python lists).
    ///
    /// Every row must have exactly ten entries.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, MatchError> {
        let mut digits = Vec::with_capacity(rows.len());
        for (position, row) in rows.into_iter().enumerate() {
            let dist: DigitDistribution =
                row.as_slice()
                    .try_into()
                    .map_err(|_| MatchError::BadDistribution {
                        position,
                        len: row.len(),
                    })?;
            digits.push(dist);
        }
        Self::new(digits)
    }

    /// Number of digit positions `D`.
    pub fn len(&self) -> usize {
        self.digits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }

    /// Probability that position `position` reads as `digit`.
    ///
    /// Panics if either index is out of range.
    pub fn probability(&self, position: usize, digit: usize) -> f64 {
        self.digits[position][digit]
    }

    /// Probabilities this paper assigns to the digits of `student_id`.
    ///
    /// Fails with [`MatchError::WrongLength`] when the ID does not have one
    /// digit per distribution.
    pub fn implied_by<'a>(
        &'a self,
        student_id: &'a StudentId,
    ) -> Result<impl Iterator<Item = f64> + 'a, MatchError> {
        if student_id.len() != self.len() {
            return Err(MatchError::WrongLength {
                expected: self.len(),
                got: student_id.len(),
            });
        }
        Ok(self
            .digits
            .iter()
            .zip(student_id.digits())
            .map(|(dist, d)| dist[d]))
    }
}

fn validate_distribution(position: usize, dist: &DigitDistribution) -> Result<(), MatchError> {
    for (digit, &value) in dist.iter().enumerate() {
        if !value.is_finite() || value < 0.0 || value > 1.0 + PROBABILITY_TOLERANCE {
            return Err(MatchError::InvalidProbability {
                position,
                digit,
                value,
            });
        }
    }
    Ok(())
}

impl TryFrom<Vec<Vec<f64>>> for DigitProbs {
    type Error = MatchError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl From<DigitProbs> for Vec<Vec<f64>> {
    fn from(probs: DigitProbs) -> Self {
        probs.digits.iter().map(|d| d.to_vec()).collect()
    }
}

/// Digit probabilities for every paper of one matching run, keyed by paper
/// number.
///
/// All entries share the same digit count. Iteration is in ascending paper
/// number.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(
    try_from = "BTreeMap<u32, DigitProbs>",
    into = "BTreeMap<u32, DigitProbs>"
)]
pub struct ProbabilityTable {
    papers: BTreeMap<u32, DigitProbs>,
}

impl ProbabilityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(paper_number, rows)` pairs as delivered by the model.
    pub fn from_rows<I>(entries: I) -> Result<Self, MatchError>
    where
        I: IntoIterator<Item = (u32, Vec<Vec<f64>>)>,
    {
        let mut table = Self::new();
        for (paper_number, rows) in entries {
            table.insert(paper_number, DigitProbs::from_rows(rows)?)?;
        }
        Ok(table)
    }

    /// Load a table from JSON: `{"<paper_number>": [[p0, .., p9], ..], ..}`.
    pub fn from_json_str(json: &str) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a table from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    /// Insert (or replace) the probabilities of one paper.
    ///
    /// Fails with [`MatchError::WrongLength`] when the digit count differs
    /// from the papers already present.
    pub fn insert(
        &mut self,
        paper_number: u32,
        probs: DigitProbs,
    ) -> Result<Option<DigitProbs>, MatchError> {
        let other = self
            .papers
            .iter()
            .find(|&(&p, _)| p != paper_number)
            .map(|(_, v)| v.len());
        if let Some(expected) = other {
            if expected != probs.len() {
                return Err(MatchError::WrongLength {
                    expected,
                    got: probs.len(),
                });
            }
        }
        Ok(self.papers.insert(paper_number, probs))
    }

    pub fn get(&self, paper_number: u32) -> Option<&DigitProbs> {
        self.papers.get(&paper_number)
    }

    pub fn contains(&self, paper_number: u32) -> bool {
        self.papers.contains_key(&paper_number)
    }

    /// Number of papers with probability data.
    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    /// Shared digit count, or `None` for an empty table.
    pub fn n_digits(&self) -> Option<usize> {
        self.papers.values().next().map(DigitProbs::len)
    }

    /// Paper numbers in ascending order.
    pub fn papers(&self) -> impl Iterator<Item = u32> + '_ {
        self.papers.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &DigitProbs)> + '_ {
        self.papers.iter().map(|(&p, probs)| (p, probs))
    }

    /// A copy holding only the listed papers that have data.
    pub fn restricted_to(&self, papers: &[u32]) -> Self {
        let papers = papers
            .iter()
            .filter_map(|&p| self.papers.get(&p).map(|probs| (p, probs.clone())))
            .collect();
        Self { papers }
    }
}

impl TryFrom<BTreeMap<u32, DigitProbs>> for ProbabilityTable {
    type Error = MatchError;

    fn try_from(papers: BTreeMap<u32, DigitProbs>) -> Result<Self, Self::Error> {
        if let Some(expected) = papers.values().next().map(DigitProbs::len) {
            if let Some(bad) = papers.values().find(|p| p.len() != expected) {
                return Err(MatchError::WrongLength {
                    expected,
                    got: bad.len(),
                });
            }
        }
        Ok(Self { papers })
    }
}

impl From<ProbabilityTable> for BTreeMap<u32, DigitProbs> {
    fn from(table: ProbabilityTable) -> Self {
        table.papers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_hot(digit: usize) -> DigitDistribution {
        let mut d = [0.0; 10];
        d[digit] = 1.0;
        d
    }

    #[test]
    fn student_id_rejects_non_digits_and_empty() {
        assert!(StudentId::new("12345678").is_ok());
        assert!(matches!(
            StudentId::new("1234a678"),
            Err(MatchError::InvalidStudentId { .. })
        ));
        assert!(matches!(
            StudentId::new(""),
            Err(MatchError::InvalidStudentId { .. })
        ));
        assert!(StudentId::new(" 1234").is_err());
    }

    #[test]
    fn student_id_digits_are_left_to_right() {
        let id: StudentId = "10293".parse().expect("valid id");
        assert_eq!(id.digits().collect::<Vec<_>>(), vec![1, 0, 2, 9, 3]);
        assert_eq!(id.len(), 5);
    }

    #[test]
    fn student_id_serializes_as_plain_string() {
        let id = StudentId::new("00000042").expect("valid id");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"00000042\"");
        let back: StudentId = serde_json::from_str("\"00000042\"").unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<StudentId>("\"12x\"").is_err());
    }

    #[test]
    fn digit_probs_rejects_short_rows() {
        let err = DigitProbs::from_rows(vec![vec![0.1; 10], vec![0.1; 9]]).unwrap_err();
        assert_eq!(
            err,
            MatchError::BadDistribution {
                position: 1,
                len: 9
            }
        );
    }

    #[test]
    fn digit_probs_rejects_nan_and_negative() {
        let mut row = [0.0; 10];
        row[3] = f64::NAN;
        assert!(matches!(
            DigitProbs::new(vec![row]),
            Err(MatchError::InvalidProbability {
                position: 0,
                digit: 3,
                ..
            })
        ));
        row[3] = -0.1;
        assert!(DigitProbs::new(vec![row]).is_err());
        row[3] = 1.5;
        assert!(DigitProbs::new(vec![row]).is_err());
    }

    #[test]
    fn digit_probs_accepts_zero_probabilities() {
        let probs = DigitProbs::new(vec![[0.0; 10], one_hot(4)]).expect("zeros are valid");
        assert_eq!(probs.len(), 2);
        assert_eq!(probs.probability(1, 4), 1.0);
    }

    #[test]
    fn implied_by_checks_length() {
        let probs = DigitProbs::new(vec![one_hot(1), one_hot(2)]).unwrap();
        let id = StudentId::new("123").unwrap();
        assert_eq!(
            probs.implied_by(&id).err(),
            Some(MatchError::WrongLength {
                expected: 2,
                got: 3
            })
        );
        let id = StudentId::new("12").unwrap();
        let implied: Vec<f64> = probs.implied_by(&id).unwrap().collect();
        assert_eq!(implied, vec![1.0, 1.0]);
    }

    #[test]
    fn table_rejects_mixed_digit_counts() {
        let mut table = ProbabilityTable::new();
        table
            .insert(1, DigitProbs::new(vec![one_hot(0); 8]).unwrap())
            .unwrap();
        let err = table
            .insert(2, DigitProbs::new(vec![one_hot(0); 7]).unwrap())
            .unwrap_err();
        assert_eq!(
            err,
            MatchError::WrongLength {
                expected: 8,
                got: 7
            }
        );
        // Replacing the only paper may change the digit count.
        table
            .insert(1, DigitProbs::new(vec![one_hot(0); 7]).unwrap())
            .unwrap();
        assert_eq!(table.n_digits(), Some(7));
    }

    #[test]
    fn table_json_uses_paper_number_keys() {
        let json = r#"{
            "12": [[0,1,0,0,0,0,0,0,0,0],[0,0,1,0,0,0,0,0,0,0]],
            "3":  [[1,0,0,0,0,0,0,0,0,0],[0,0,0,0,0,0,0,0,0,1]]
        }"#;
        let table = ProbabilityTable::from_json_str(json).expect("table json should parse");
        assert_eq!(table.papers().collect::<Vec<_>>(), vec![3, 12]);
        assert_eq!(table.n_digits(), Some(2));
        assert_eq!(table.get(12).unwrap().probability(1, 2), 1.0);
    }

    #[test]
    fn table_json_rejects_mixed_lengths() {
        let json = r#"{
            "1": [[1,0,0,0,0,0,0,0,0,0]],
            "2": [[1,0,0,0,0,0,0,0,0,0],[1,0,0,0,0,0,0,0,0,0]]
        }"#;
        assert!(ProbabilityTable::from_json_str(json).is_err());
    }

    #[test]
    fn restricted_to_skips_papers_without_data() {
        let table = ProbabilityTable::from_rows(vec![
            (1, vec![one_hot(1).to_vec()]),
            (2, vec![one_hot(2).to_vec()]),
            (3, vec![one_hot(3).to_vec()]),
        ])
        .unwrap();
        let sub = table.restricted_to(&[3, 1, 99]);
        assert_eq!(sub.papers().collect::<Vec<_>>(), vec![1, 3]);
    }
}
