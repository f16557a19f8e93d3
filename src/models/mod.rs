pub mod enums;
pub mod diagnosis;
pub mod knowledge;

pub use enums::*;
pub use diagnosis::*;
pub use knowledge::*;
