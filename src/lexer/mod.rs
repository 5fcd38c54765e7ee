//! Literal parsing
//!
//! Turns literal source text (`5`, `b'00ff'`, `PubKey(b'02..')`) into a typed
//! scalar plus its ASM token.

mod literal;
mod token;

pub use literal::parse_literal;
pub use token::{Literal, LiteralKind};
