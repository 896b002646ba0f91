pub mod canonical;
pub mod error;
pub mod http;
pub mod traits;
pub mod types;

pub use canonical::*;
pub use error::*;
pub use http::*;
pub use traits::*;
pub use types::*;
