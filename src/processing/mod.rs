pub mod aggregate;
pub mod statistics;
pub mod window;
