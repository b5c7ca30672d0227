pub mod demo;
pub mod pool;
pub mod portfolio;
pub mod requests;
pub mod schedule;
pub mod taxonomy;
