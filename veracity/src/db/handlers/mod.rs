pub mod api_keys;
pub mod blocked_domains;
pub mod contents;
pub mod jobs;
pub mod repository;
pub mod scores;
pub mod users;

pub use api_keys::ApiKeys;
pub use blocked_domains::BlockedDomains;
pub use contents::Contents;
pub use jobs::Jobs;
pub use repository::Repository;
pub use scores::Scores;
pub use users::Users;
