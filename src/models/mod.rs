pub mod vulnerability;
pub mod category;
pub mod attempt;
pub mod verdict;

pub use vulnerability::*;
pub use category::*;
pub use attempt::*;
pub use verdict::*;
