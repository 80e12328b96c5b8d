//! Business logic services.

pub mod affiliate;
pub mod audit;
pub mod auth;
pub mod cache;
pub mod catalog;
pub mod certificate;
pub mod enrollment;
pub mod learning_hub;
pub mod metrics;
pub mod payout;
pub mod recommendations;
pub mod streak;
