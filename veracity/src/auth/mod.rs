pub mod current_user;
pub mod session;
pub mod tier;

pub use current_user::AuthContext;
pub use tier::{DbTierResolver, StubTierResolver, TierResolver};
