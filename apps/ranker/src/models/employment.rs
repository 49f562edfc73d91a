use serde::{Deserialize, Serialize};

/// Separator used when responsibilities are stored as one string.
pub const RESPONSIBILITY_DELIMITER: char = ';';

/// One past position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmploymentRecord {
    pub company: String,
    pub location: String,
    pub title: String,
    /// Free text, e.g. "Jan. 2010".
    pub start_date: String,
    /// Free text. `None` means the position is ongoing.
    pub end_date: Option<String>,
    pub field: String,
    pub responsibilities: Vec<String>,
}

impl EmploymentRecord {
    /// Replaces the responsibilities with the pieces of a `;`-separated string.
    pub fn with_delimited_responsibilities(mut self, delimited: &str) -> Self {
        self.responsibilities = split_responsibilities(delimited);
        self
    }

    /// "Title at Company, Location start - end" for log lines.
    pub fn label(&self) -> String {
        format!(
            "{} at {}, {} {} - {}",
            self.title,
            self.company,
            self.location,
            self.start_date,
            self.end_date.as_deref().unwrap_or("Present")
        )
    }
}

/// Splits a stored responsibility string on `;`, trimming and dropping empty pieces.
pub fn split_responsibilities(delimited: &str) -> Vec<String> {
    delimited
        .split(RESPONSIBILITY_DELIMITER)
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}
