pub mod blast;
pub mod catalog;
pub mod genotype;
pub mod io;
pub mod resolve;
pub mod scheme;
pub mod summary;
