//! Medibook - clinic and doctor booking backend
//!
//! Dual-mode authentication: password login for clinic staff, one-time
//! phone codes for patients, with signed bearer credentials and a hashed
//! token ledger.

pub mod account;
pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod directory;
pub mod error;
pub mod server;
