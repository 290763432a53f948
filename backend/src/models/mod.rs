pub mod analytics;
pub mod chapter;
pub mod manga;
pub mod page;

pub use analytics::*;
pub use chapter::*;
pub use manga::*;
pub use page::*;
