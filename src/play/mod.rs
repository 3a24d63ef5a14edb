pub mod bulk;
pub mod category;
pub mod details;
pub mod package;
pub mod verify;

pub use bulk::BulkDetails;
pub use category::CategoryScraper;
pub use details::{iter_package_details, parse_play_page, read_package_to_repos, PlayPage};
pub use package::{Package, PackageRepos};
pub use verify::PlayVerifier;
