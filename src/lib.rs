pub mod api;
pub mod catalog;
pub mod chart;
pub mod clock;
pub mod compare;
pub mod config;
pub mod duration;
pub mod export;
pub mod format;
pub mod history;
pub mod notify;
pub mod session;
pub mod table;
#[cfg(feature = "tui")]
pub mod tui;
