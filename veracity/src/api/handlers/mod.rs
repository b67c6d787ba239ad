pub mod api_keys;
pub mod blocklist;
pub mod detect;
pub mod health;
pub mod jobs;
pub mod usage;
pub mod workers;
