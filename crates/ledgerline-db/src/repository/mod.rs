//! # Repository Layer
//!
//! One repository per aggregate. Plain CRUD methods run against the
//! pool; mutation helpers that must compose into a larger atomic unit
//! (ship, return, record) are associated functions taking a
//! `&mut SqliteConnection`, so the caller owns the transaction boundary.

pub mod cash_account;
pub mod commission;
pub mod order;
pub mod product;
pub mod sale;
pub mod settlement;
pub mod tenant;
