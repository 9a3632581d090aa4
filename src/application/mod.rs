pub mod account_view;
pub mod app;
pub mod header;
pub mod reactive;
