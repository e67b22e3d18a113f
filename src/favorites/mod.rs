pub mod reconcile;

pub use reconcile::{AddOutcome, Favorites};
