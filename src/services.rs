pub mod auth;
pub mod present_value;
pub mod pricing_service;
pub mod proposal_service;
pub mod scope_service;
