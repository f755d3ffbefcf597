pub mod alignment;
pub mod judge;
pub mod metaprompt;
pub mod rewrite;

pub use alignment::*;
pub use judge::*;
pub use metaprompt::*;
pub use rewrite::*;
