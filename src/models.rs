pub mod auth;
pub mod pricing;
pub mod proposal;
pub mod scope;
