//! # Liquidity Network Test Suite
//!
//! Cross-crate scenarios driven through the block service, plus the
//! benchmarks under `benches/`.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── harness.rs        # In-memory network: operators, vaults, pools, blocks
//! └── integration/      # End-to-end scenarios
//!     ├── node_lifecycle.rs   # Ban consensus, churn window
//!     ├── vaults.rs           # Gas subsidy, keygen failure, yggdrasil theft
//!     ├── ragnarok.rs         # Network shutdown stages
//!     ├── liquidity.rs        # Pool conservation
//!     └── runtime.rs          # Genesis, executor and export
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p tc-tests
//!
//! # By category
//! cargo test -p tc-tests integration::ragnarok
//!
//! # Benchmarks
//! cargo bench -p tc-tests
//! ```

pub mod harness;
pub mod integration;
