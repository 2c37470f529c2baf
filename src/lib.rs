pub mod config;
pub mod dispatcher;
pub mod humanize;
pub mod observability;
pub mod supervisor;
pub mod worker;
