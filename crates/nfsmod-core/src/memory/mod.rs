mod address;
mod codec;
mod game;
mod protected;
mod text;

pub use address::Address;
pub use codec::{Primitive, Value, ValueKind};
pub use game::GameMemory;
pub use protected::ProtectedMemory;
pub use text::TextEncoding;
