pub mod bare;
pub mod history;

pub use bare::{BareGit, GrepMatch};
pub use history::{Commit, DiffStats, GitHistory};
