pub mod trading;
pub mod series;
pub mod frame;

pub use trading::*;
pub use series::*;
pub use frame::*;
