pub mod alignment;
pub mod expansion;
pub mod message;
pub mod tournament;

pub use alignment::*;
pub use expansion::*;
pub use message::*;
pub use tournament::*;
