pub mod background;
pub mod client;
pub mod query;
