pub mod libs;

pub use crate::libs::blast::*;
pub use crate::libs::catalog::*;
pub use crate::libs::genotype::*;
pub use crate::libs::io::*;
pub use crate::libs::resolve::*;
pub use crate::libs::scheme::*;
pub use crate::libs::summary::*;
