pub mod mutation;
pub mod query;
pub mod transaction;

pub use mutation::MutationCoordinator;
pub use query::{QueryState, VaultQueryService};
pub use transaction::{AssemblerConfig, TransactionAssembler};
