//! kasa-storage: the host key-value storage the vault persists into
//!
//! The vault reads and writes through `get`, `set` and `remove` over
//! string keys and string values. Absence of a key is a normal answer
//! (`None`), not an error.

pub mod health;
pub mod kv;
pub mod operator;

pub use health::check_health;
pub use kv::KeyValueStore;
pub use operator::build_operator;
