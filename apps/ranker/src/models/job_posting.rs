use serde::{Deserialize, Serialize};

/// Snapshot of a target opening. Every field is free text and may be empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobPosting {
    pub title: String,
    pub company_name: String,
    pub location: String,
    pub job_type: String,
    pub description: String,
    pub responsibilities: String,
    pub requirements: String,
    pub preferred_qualifications: String,
    pub technologies: String,
    pub soft_skills: String,

    // Bookkeeping carried through from the posting store; never scored.
    pub salary_range: Option<String>,
    pub application_deadline: Option<String>,
    pub application_url: Option<String>,
    pub posting_date: Option<String>,
    pub job_id: Option<String>,
    pub hiring_manager: Option<String>,
    pub hiring_address: Option<String>,
}

impl JobPosting {
    /// The single text the posting is encoded as: title, description, requirements,
    /// preferred qualifications, technologies and soft skills, one per line.
    /// Empty fields keep their (empty) line.
    pub fn query_text(&self) -> String {
        [
            self.title.as_str(),
            self.description.as_str(),
            self.requirements.as_str(),
            self.preferred_qualifications.as_str(),
            self.technologies.as_str(),
            self.soft_skills.as_str(),
        ]
        .join("\n")
    }
}
