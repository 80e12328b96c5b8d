//! Database models and DTOs for all domain entities.

pub mod audit;
pub mod learning;
pub mod pagination;
pub mod referral;
pub mod track;
pub mod user;
