pub mod error;
pub mod risk;
pub mod types;

pub use error::*;
pub use risk::RiskState;
pub use types::*;
