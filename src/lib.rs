pub mod commands;
pub mod db;
pub mod error;
pub mod models;
pub mod pricing;

#[cfg(feature = "desktop")]
mod desktop;


#[cfg(feature = "desktop")]
pub use desktop::run;
