/// Loyalty points backend
///
/// Accounts register and log in with bearer tokens, redeem promotional codes
/// for points and exchange points for rewards. Every balance change is
/// recorded in an append-only ledger inside the same database transaction.

pub mod account;
pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod points;
pub mod rate_limit;
pub mod seed;
pub mod server;
