//! Index implementations for fetching package releases

pub mod pypi;

pub use pypi::PyPiIndex;
