pub mod config;
pub mod history;
pub mod policy;
pub mod scan;
