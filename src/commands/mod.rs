pub mod matches;
pub mod orders;
pub mod reports;
pub mod settings;
pub mod tables;
