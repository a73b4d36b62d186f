pub mod tenancy_repo;
pub use tenancy_repo::TenantRepository;
pub mod pricing_repo;
pub use pricing_repo::PricingRepository;
pub mod proposal_repo;
pub use proposal_repo::ProposalRepository;
pub mod scope_repo;
pub use scope_repo::{PgScopeStore, ScopeStore};
