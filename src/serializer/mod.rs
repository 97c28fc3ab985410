//! Translation between wire payloads and storage types

pub mod users;

pub use users::UserSerializer;
