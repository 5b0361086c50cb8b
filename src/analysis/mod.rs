pub mod normalize;

pub use normalize::{normalize_lemma, strip_accents};
