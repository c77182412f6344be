pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod khqr;
pub mod order;
pub mod storage;
pub mod store;
pub mod supabase;
pub mod telegram;
pub mod types;
