mod cart;
mod catalog;
mod matches;

pub use cart::Cart;
pub use catalog::{FetchOutcome, StoreCatalog};
pub use matches::{MatchStore, MatchViews};
