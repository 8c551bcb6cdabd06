pub mod datetime;
pub mod discovery;
pub mod loader;
pub mod normalize;
pub mod parser;
pub mod schema;
