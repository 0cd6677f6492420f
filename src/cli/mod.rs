pub mod rank;
pub mod setup;
pub mod ui;
