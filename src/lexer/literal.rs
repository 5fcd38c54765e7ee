//! Literal grammar
//!
//! ```text
//! true | false
//! -?(0|[1-9][0-9]*)          decimal integer
//! -?0x[0-9a-fA-F]+           hex integer
//! b'([0-9a-fA-F]{2})*'       byte string
//! PrivKey(<integer>)
//! <Wrapper>(b'...')          PubKey, Sig, Ripemd160, PubKeyHash, Sha1, ...
//! ```

use super::token::{Literal, LiteralKind};
use crate::error::{Error, Result};
use crate::types::{DataKind, ScalarType};
use crate::value::{Scalar, ScalarData};
use lazy_static::lazy_static;
use num_bigint::{BigInt, Sign};
use regex::Regex;

lazy_static! {
    static ref DECIMAL: Regex = Regex::new(r"^-?(0|[1-9][0-9]*)$").unwrap();
    static ref HEX_INT: Regex = Regex::new(r"^(-?)0x([0-9a-fA-F]+)$").unwrap();
    static ref BYTE_STRING: Regex = Regex::new(r"^b'([0-9a-fA-F]*)'$").unwrap();
    static ref WRAPPED: Regex = Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\s*\((.*)\)$").unwrap();
}

/// Source name accepted as a wrapper but mapped onto another scalar type
const WRAPPER_ALIASES: &[(&str, ScalarType)] = &[("PubKeyHash", ScalarType::Ripemd160)];

/// Parse a literal string
pub fn parse_literal(input: &str) -> Result<Literal> {
    let text = input.trim();

    match text {
        "true" => return Ok(Literal::new(LiteralKind::Boolean, Scalar::bool(true))),
        "false" => return Ok(Literal::new(LiteralKind::Boolean, Scalar::bool(false))),
        _ => {}
    }

    if let Some((kind, n)) = parse_integer(text)? {
        return Ok(Literal::new(kind, Scalar::int(n)));
    }

    if let Some(bytes) = parse_byte_string(text)? {
        return Ok(Literal::new(LiteralKind::ByteString, Scalar::bytes(bytes)));
    }

    if let Some(caps) = WRAPPED.captures(text) {
        let name = &caps[1];
        let inner = caps[2].trim();
        let ty = wrapper_type(name).ok_or_else(|| {
            Error::parse(input, format!("`{}` is not a scalar wrapper type", name))
        })?;

        let data = match ty.data_kind() {
            DataKind::Int => match parse_integer(inner)? {
                Some((_, n)) => ScalarData::Int(n),
                None => return Err(Error::parse(input, format!("{} takes an integer", name))),
            },
            DataKind::Bytes => match parse_byte_string(inner)? {
                Some(bytes) => ScalarData::Bytes(bytes),
                None => {
                    return Err(Error::parse(
                        input,
                        format!("{} takes a b'...' byte string", name),
                    ))
                }
            },
            DataKind::Bool => return Err(Error::parse(input, "bool has no wrapper form")),
        };

        let value = Scalar::new(ty, data).map_err(|e| Error::parse(input, e.to_string()))?;
        return Ok(Literal::new(LiteralKind::Wrapped(ty), value));
    }

    Err(Error::parse(input, "no literal form matches"))
}

fn wrapper_type(name: &str) -> Option<ScalarType> {
    WRAPPER_ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, ty)| *ty)
        .or_else(|| ScalarType::from_name(name).filter(|ty| ty.is_wrapper()))
}

fn parse_integer(text: &str) -> Result<Option<(LiteralKind, BigInt)>> {
    if DECIMAL.is_match(text) {
        let n = text
            .parse::<BigInt>()
            .map_err(|e| Error::parse(text, e.to_string()))?;
        return Ok(Some((LiteralKind::Decimal, n)));
    }

    if let Some(caps) = HEX_INT.captures(text) {
        let magnitude = BigInt::parse_bytes(caps[2].as_bytes(), 16)
            .ok_or_else(|| Error::parse(text, "invalid hex digits"))?;
        let n = if &caps[1] == "-" {
            BigInt::from_biguint(Sign::Minus, magnitude.magnitude().clone())
        } else {
            magnitude
        };
        return Ok(Some((LiteralKind::Hex, n)));
    }

    Ok(None)
}

fn parse_byte_string(text: &str) -> Result<Option<Vec<u8>>> {
    let Some(caps) = BYTE_STRING.captures(text) else {
        return Ok(None);
    };
    let digits = &caps[1];
    if digits.len() % 2 != 0 {
        return Err(Error::parse(text, "byte string has an odd number of hex digits"));
    }
    hex::decode(digits)
        .map(Some)
        .map_err(|e| Error::parse(text, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_booleans() {
        let lit = parse_literal("true").unwrap();
        assert_eq!(lit.kind, LiteralKind::Boolean);
        assert_eq!(lit.asm, "OP_TRUE");
        assert_eq!(parse_literal(" false ").unwrap().value, Scalar::bool(false));
    }

    #[test]
    fn test_integers() {
        let lit = parse_literal("-1000").unwrap();
        assert_eq!(lit.value, Scalar::int(-1000));
        assert_eq!(lit.asm, "e883");

        let lit = parse_literal("0x10").unwrap();
        assert_eq!(lit.kind, LiteralKind::Hex);
        assert_eq!(lit.value, Scalar::int(16));
        assert_eq!(parse_literal("-0xff").unwrap().value, Scalar::int(-255));

        let huge = "123456789012345678901234567890123456789";
        let lit = parse_literal(huge).unwrap();
        assert_eq!(lit.value.to_literal(), huge);
    }

    #[test]
    fn test_rejects_leading_zero_and_floats() {
        assert_eq!(parse_literal("007").unwrap_err().kind(), ErrorKind::Parse);
        assert_eq!(parse_literal("1.5").unwrap_err().kind(), ErrorKind::Parse);
        assert_eq!(parse_literal("").unwrap_err().kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_byte_strings() {
        let lit = parse_literal("b'00ff'").unwrap();
        assert_eq!(lit.value, Scalar::bytes(vec![0x00, 0xff]));
        assert_eq!(lit.asm, "00ff");

        let empty = parse_literal("b''").unwrap();
        assert_eq!(empty.asm, "OP_0");

        let err = parse_literal("b'abc'").unwrap_err();
        assert!(err.to_string().contains("odd number"));
        assert!(parse_literal("b'zz'").is_err());
    }

    #[test]
    fn test_wrappers() {
        let lit = parse_literal("PrivKey(12)").unwrap();
        assert_eq!(lit.ty(), ScalarType::PrivKey);
        assert_eq!(lit.value.as_int(), Some(&BigInt::from(12)));

        let lit = parse_literal("PubKey(b'02ab')").unwrap();
        assert_eq!(lit.kind, LiteralKind::Wrapped(ScalarType::PubKey));
        assert_eq!(lit.value.as_bytes(), Some(&[0x02, 0xab][..]));

        let lit = parse_literal("PubKeyHash(b'00')").unwrap();
        assert_eq!(lit.ty(), ScalarType::Ripemd160);
    }

    #[test]
    fn test_wrapper_errors() {
        assert!(parse_literal("PubKey(3)").is_err());
        assert!(parse_literal("PrivKey(b'00')").is_err());
        assert!(parse_literal("Foo(3)").is_err());
        assert!(parse_literal("int(3)").is_err());
    }

    #[test]
    fn test_canonical_literal_reparses() {
        for text in ["0", "-5", "0x1f", "true", "b''", "Sig(b'30')", "PrivKey(-0x2)"] {
            let lit = parse_literal(text).unwrap();
            let again = parse_literal(&lit.value.to_literal()).unwrap();
            assert_eq!(again.value, lit.value, "literal {}", text);
        }
    }
}
