pub mod layout;
pub mod wal;
pub mod checkpoint;
pub mod fact_segment;
pub mod file_lock;
