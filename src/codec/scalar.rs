//! Little-endian sign-magnitude integer codec
//!
//! The script VM stores numbers as little-endian magnitude bytes with the sign
//! carried in the most significant bit of the last byte. `-1000` is `e8 83`,
//! `128` needs a padding byte (`80 00`), `-128` is `80 80`.

use crate::error::{Error, Result};
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::Zero;

/// Minimal script-number bytes: zero is the empty vector.
pub fn encode_script_num(n: &BigInt) -> Vec<u8> {
    if n.is_zero() {
        return Vec::new();
    }

    let mut bytes = n.magnitude().to_bytes_le();
    let negative = n.sign() == Sign::Minus;
    let last = bytes[bytes.len() - 1];

    if last & 0x80 != 0 {
        // High bit is taken by the magnitude, sign goes into an extra byte
        bytes.push(if negative { 0x80 } else { 0x00 });
    } else if negative {
        let idx = bytes.len() - 1;
        bytes[idx] |= 0x80;
    }

    bytes
}

/// Encode an integer in sign-magnitude form.
///
/// Without `length` the minimal form is produced and zero becomes a single
/// zero byte. With `length` the magnitude is zero-padded to exactly that many
/// bytes and the sign bit moves into the last byte.
pub fn encode_int(n: &BigInt, length: Option<usize>) -> Result<Vec<u8>> {
    let minimal = encode_script_num(n);

    let length = match length {
        None if minimal.is_empty() => return Ok(vec![0x00]),
        None => return Ok(minimal),
        Some(length) => length,
    };

    if minimal.len().max(1) > length {
        return Err(Error::Overflow {
            value: n.to_string(),
            length,
        });
    }

    let mut out = n.magnitude().to_bytes_le();
    out.resize(length, 0x00);
    if n.sign() == Sign::Minus {
        out[length - 1] |= 0x80;
    }
    Ok(out)
}

/// Decode sign-magnitude bytes; the empty slice is zero.
pub fn decode_int(bytes: &[u8]) -> BigInt {
    let Some((&last, _)) = bytes.split_last() else {
        return BigInt::zero();
    };

    let mut magnitude = bytes.to_vec();
    let idx = magnitude.len() - 1;
    magnitude[idx] = last & 0x7f;

    let magnitude = BigUint::from_bytes_le(&magnitude);
    if last & 0x80 != 0 {
        -BigInt::from(magnitude)
    } else {
        BigInt::from(magnitude)
    }
}

/// Encode a boolean as `0x01` / `0x00`
pub fn encode_bool(flag: bool) -> Vec<u8> {
    vec![u8::from(flag)]
}

/// Decode a boolean push: `01` is true, empty or `00` is false
pub fn decode_bool(bytes: &[u8]) -> Result<bool> {
    match bytes {
        [] | [0x00] => Ok(false),
        [0x01] => Ok(true),
        other => Err(Error::malformed_state(format!(
            "`{}` is not a boolean",
            hex::encode(other)
        ))),
    }
}

/// Decode a hex string into bytes, requiring even length
pub fn decode_hex(input: &str) -> Result<Vec<u8>> {
    hex::decode(input).map_err(|e| Error::InvalidHex {
        input: input.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enc(n: i64, len: Option<usize>) -> String {
        hex::encode(encode_int(&BigInt::from(n), len).unwrap())
    }

    #[test]
    fn test_encode_minimal() {
        assert_eq!(enc(0, None), "00");
        assert_eq!(enc(1, None), "01");
        assert_eq!(enc(-1, None), "81");
        assert_eq!(enc(127, None), "7f");
        assert_eq!(enc(128, None), "8000");
        assert_eq!(enc(-128, None), "8080");
        assert_eq!(enc(255, None), "ff00");
        assert_eq!(enc(256, None), "0001");
    }

    #[test]
    fn test_encode_fixed_width() {
        assert_eq!(enc(-1000, Some(2)), "e883");
        assert_eq!(enc(1000, Some(4)), "e8030000");
        assert_eq!(enc(-1, Some(3)), "010080");
        assert_eq!(enc(0, Some(3)), "000000");
    }

    #[test]
    fn test_encode_overflow() {
        let err = encode_int(&BigInt::from(128), Some(1)).unwrap_err();
        assert_eq!(
            err,
            Error::Overflow {
                value: "128".to_string(),
                length: 1
            }
        );
        assert!(encode_int(&BigInt::from(0), Some(0)).is_err());
    }

    #[test]
    fn test_decode() {
        assert_eq!(decode_int(&hex::decode("e883").unwrap()), BigInt::from(-1000));
        assert_eq!(decode_int(&[]), BigInt::zero());
        assert_eq!(decode_int(&[0x80]), BigInt::zero());
        assert_eq!(decode_int(&[0x00, 0x80]), BigInt::zero());
        assert_eq!(decode_int(&[0x80, 0x00]), BigInt::from(128));
    }

    #[test]
    fn test_beyond_machine_word() {
        let n: BigInt = "-340282366920938463463374607431768211457".parse().unwrap();
        let bytes = encode_int(&n, None).unwrap();
        assert_eq!(decode_int(&bytes), n);
        let padded = encode_int(&n, Some(32)).unwrap();
        assert_eq!(padded.len(), 32);
        assert_eq!(decode_int(&padded), n);
    }

    #[test]
    fn test_bool_codec() {
        assert_eq!(encode_bool(true), vec![0x01]);
        assert_eq!(encode_bool(false), vec![0x00]);
        assert!(decode_bool(&[0x01]).unwrap());
        assert!(!decode_bool(&[]).unwrap());
        assert!(decode_bool(&[0x02]).is_err());
    }

    #[test]
    fn test_decode_hex_rejects_odd_length() {
        assert!(decode_hex("abc").is_err());
        assert_eq!(decode_hex("").unwrap(), Vec::<u8>::new());
    }
}
