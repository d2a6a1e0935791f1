pub mod error;
pub mod station;
pub mod transaction;
pub mod vid;
pub mod wallet;
