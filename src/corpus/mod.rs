pub mod labels;
pub mod lemma_index;
pub mod models;
pub mod query;
pub mod store;
pub mod tables;

pub use labels::CatalogLabels;
pub use models::{Definition, Lemma, NewDefinition, PassageLemma, TextEdition};
pub use query::{PassageQuery, RefOrder};
pub use store::CorpusStore;
pub use tables::Tables;
