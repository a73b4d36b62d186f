pub mod pricing;
pub mod proposals;
pub mod scopes;
