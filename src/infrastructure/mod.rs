pub mod in_memory;
pub mod mail;
pub mod providers;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod signing;
