pub mod api_keys;
pub mod blocked_domains;
pub mod contents;
pub mod jobs;
pub mod scores;
pub mod users;
