pub mod identity;
pub mod sse;
pub mod store;
pub mod types;

pub use identity::{AuthError, AuthResult, IdentityClient};
pub use store::{CloudStore, FavoritesCollection, StoreError, StoreResult, Subscription};
pub use types::AuthUser;
