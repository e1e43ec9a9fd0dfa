mod archive;
mod chats;

pub use archive::*;
pub use chats::*;
