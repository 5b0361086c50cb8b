pub mod sort_key;
pub mod predicate;
pub mod scope;

pub use predicate::RefPredicate;
pub use scope::RefScope;
pub use sort_key::{natural_sort_key, LevelKey, RefKey, MAX_DEPTH};
