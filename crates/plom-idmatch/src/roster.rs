//! Classlist roster: the candidate student IDs for a matching run.
//!
//! Roster JSON:
//!
//! ```json
//! {"students": [{"id": "12345678", "name": "Doe, Jo", "paper_number": 7}]}
//! ```
//!
//! `name` and `paper_number` are optional. A `paper_number` marks a prenamed
//! paper: the exam was printed with this student's name on it.

use std::collections::HashSet;
use std::path::Path;

use crate::digits::StudentId;
use crate::error::MatchError;

/// One classlist row.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RosterEntry {
    pub id: StudentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paper_number: Option<u32>,
}

impl RosterEntry {
    /// Entry with only an ID.
    pub fn from_id(id: StudentId) -> Self {
        Self {
            id,
            name: None,
            paper_number: None,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct RosterFile {
    students: Vec<RosterEntry>,
}

/// Ordered classlist whose IDs all have the same number of digits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roster {
    entries: Vec<RosterEntry>,
}

impl Roster {
    /// Build a roster, checking that every ID has the same length.
    ///
    /// Duplicate IDs are a classlist data error; they are kept as-is and
    /// reported at `warn` level.
    pub fn new(entries: Vec<RosterEntry>) -> Result<Self, MatchError> {
        if let Some(first) = entries.first() {
            let expected = first.id.len();
            if let Some(bad) = entries.iter().find(|e| e.id.len() != expected) {
                return Err(MatchError::WrongLength {
                    expected,
                    got: bad.id.len(),
                });
            }
        }

        let mut seen = HashSet::with_capacity(entries.len());
        for e in &entries {
            if !seen.insert(&e.id) {
                tracing::warn!(student_id = %e.id, "roster: duplicate student id");
            }
        }

        Ok(Self { entries })
    }

    /// Roster from bare IDs.
    pub fn from_ids(ids: impl IntoIterator<Item = StudentId>) -> Result<Self, MatchError> {
        Self::new(ids.into_iter().map(RosterEntry::from_id).collect())
    }

    /// Load a roster from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let file: RosterFile = serde_json::from_str(json)?;
        Self::new(file.students).map_err(Into::into)
    }

    /// Load a roster from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Shared ID length, or `None` for an empty roster.
    pub fn id_len(&self) -> Option<usize> {
        self.entries.first().map(|e| e.id.len())
    }

    /// All roster IDs in classlist order.
    pub fn ids(&self) -> impl Iterator<Item = &StudentId> + '_ {
        self.entries.iter().map(|e| &e.id)
    }

    /// Roster IDs not yet used by an identified paper, in classlist order.
    ///
    /// Entries of `already_matched` that are not on the roster are ignored.
    pub fn candidate_ids(&self, already_matched: &[StudentId]) -> Vec<StudentId> {
        remove_matched(self.ids().cloned(), already_matched)
    }

    /// `(paper_number, id)` for every prenamed entry.
    pub fn prenamed(&self) -> Vec<(u32, StudentId)> {
        self.entries
            .iter()
            .filter_map(|e| e.paper_number.map(|p| (p, e.id.clone())))
            .collect()
    }
}

/// Drop every ID in `already_matched` from `ids`, preserving order.
///
/// Matched IDs missing from `ids` are silently ignored.
pub fn remove_matched(
    ids: impl IntoIterator<Item = StudentId>,
    already_matched: &[StudentId],
) -> Vec<StudentId> {
    let used: HashSet<&StudentId> = already_matched.iter().collect();
    ids.into_iter().filter(|id| !used.contains(id)).collect()
}
