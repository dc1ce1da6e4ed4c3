pub mod claude;
pub mod error;
pub mod schema;
pub mod util;

pub use claude::Claude;
pub use error::{AiClientError, Result};
pub use schema::StructuredOutput;
