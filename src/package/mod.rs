// Package resolution layer
// - cache.rs: SQLite cache implementation
// - repository.rs: Repository trait over cached packages
// - index.rs: Index trait definition
// - indexes/: Index implementations
//   - pypi.rs: PyPI JSON API
// - resolver.rs: Cache-or-refresh resolution
// - stats.rs: Release date formatting
// - clock.rs: Time source
// - types.rs: Common types (Package, Release, PackageInfo)
pub mod cache;
pub mod clock;
pub mod error;
pub mod index;
pub mod indexes;
pub mod repository;
pub mod resolver;
pub mod stats;
pub mod types;
