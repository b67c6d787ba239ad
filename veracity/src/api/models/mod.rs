pub mod api_keys;
pub mod blocklist;
pub mod detect;
pub mod jobs;
pub mod workers;
