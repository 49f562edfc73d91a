pub mod employment;
pub mod job_posting;

pub use employment::{split_responsibilities, EmploymentRecord};
pub use job_posting::JobPosting;
