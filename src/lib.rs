pub mod command;
pub mod error;
pub mod event;
pub mod notify;
pub mod onboard;
pub mod ui;
