use crate::types::ScalarType;
use crate::value::Scalar;

/// Which literal production matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    /// `true` / `false`
    Boolean,
    /// Decimal integer
    Decimal,
    /// `0x`-prefixed integer
    Hex,
    /// `b'...'` byte string
    ByteString,
    /// `Name(...)` wrapper constructor
    Wrapped(ScalarType),
}

/// A parsed literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    /// Production that matched
    pub kind: LiteralKind,
    /// ASM token for the value
    pub asm: String,
    /// Typed value
    pub value: Scalar,
}

impl Literal {
    /// Build a literal, deriving the ASM token from the value
    pub fn new(kind: LiteralKind, value: Scalar) -> Self {
        Literal {
            kind,
            asm: value.to_asm(),
            value,
        }
    }

    /// Canonical type of the value
    pub fn ty(&self) -> ScalarType {
        self.value.ty()
    }
}
