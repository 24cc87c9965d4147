pub mod clear_cache;
pub mod index;
pub mod search;
pub mod serve;

use crate::error::Result;

pub use clear_cache::ClearCacheCommand;
pub use index::IndexCommand;
pub use search::{SearchCommand, SuggestCommand};
pub use serve::ServeCommand;

#[async_trait::async_trait]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}
