pub mod mint_authorities;
pub mod pool_cache;
pub mod pool_manager;
pub mod store;

pub use mint_authorities::{MintAuthorities, TokenMint};
pub use pool_cache::PoolCache;
pub use pool_manager::{PoolCreationRequest, PoolLookup, PoolManager, PoolOrigin, PoolRecord, PoolValidation};
pub use store::{JsonPoolStore, PoolStore, ThreadBinding};
