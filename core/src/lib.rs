pub mod achievements;
pub mod editor;
pub mod error;
pub mod food_table;
pub mod gemini;
pub mod history;
pub mod identity;
pub mod ledger;
pub mod models;
pub mod nutrition;
pub mod provider;
pub mod service;
pub mod settings;
pub mod store;
