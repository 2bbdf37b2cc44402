//! Base58Check: the text encoding behind addresses and WIF keys.
//!
//! `base58(payload || SHA256d(payload)[0..4])`, with one `'1'` emitted per
//! leading zero byte and the remainder treated as a big-endian integer in
//! base 58.

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// The 58-character alphabet; `0`, `O`, `I` and `l` are omitted.
const ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

fn sha256d(data: &[u8]) -> [u8; 32] {
    Sha256::digest(Sha256::digest(data)).into()
}

fn digit_value(c: u8) -> Option<u32> {
    ALPHABET.iter().position(|&a| a == c).map(|i| i as u32)
}

/// Encodes `input` with its 4-byte SHA256d checksum appended.
pub fn encode(input: &[u8]) -> String {
    let checksum = sha256d(input);
    let mut payload = Vec::with_capacity(input.len() + 4);
    payload.extend_from_slice(input);
    payload.extend_from_slice(&checksum[..4]);

    let zeros = payload.iter().take_while(|&&b| b == 0).count();

    // Schoolbook base conversion: fold each byte into an accumulating
    // little-endian base-58 digit vector.
    let mut digits: Vec<u8> = Vec::with_capacity(payload.len() * 138 / 100 + 1);
    for &byte in &payload[zeros..] {
        let mut carry = u32::from(byte);
        for digit in digits.iter_mut() {
            carry += u32::from(*digit) << 8;
            *digit = (carry % 58) as u8;
            carry /= 58;
        }
        while carry > 0 {
            digits.push((carry % 58) as u8);
            carry /= 58;
        }
    }

    let mut out = String::with_capacity(zeros + digits.len());
    for _ in 0..zeros {
        out.push('1');
    }
    for &digit in digits.iter().rev() {
        out.push(ALPHABET[digit as usize] as char);
    }
    out
}

/// Decodes a Base58Check string, verifying and stripping the checksum.
pub fn decode(s: &str) -> Result<Vec<u8>> {
    let bytes = s.as_bytes();
    let zeros = bytes.iter().take_while(|&&b| b == b'1').count();

    let mut digits: Vec<u8> = Vec::with_capacity(bytes.len());
    for &c in &bytes[zeros..] {
        let mut carry =
            digit_value(c).ok_or(Error::InvalidFormat("character outside base58 alphabet"))?;
        for digit in digits.iter_mut() {
            carry += u32::from(*digit) * 58;
            *digit = (carry & 0xFF) as u8;
            carry >>= 8;
        }
        while carry > 0 {
            digits.push((carry & 0xFF) as u8);
            carry >>= 8;
        }
    }

    let mut payload = vec![0u8; zeros];
    payload.extend(digits.iter().rev());

    if payload.len() < 4 {
        return Err(Error::InvalidFormat("base58check payload too short"));
    }
    let (data, checksum) = payload.split_at(payload.len() - 4);
    if sha256d(data)[..4] != *checksum {
        return Err(Error::InvalidChecksum("base58check"));
    }
    Ok(data.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_arbitrary_payloads() {
        let payloads: [&[u8]; 5] = [
            b"",
            b"\x00",
            b"hello world",
            &[0xFF; 32],
            &[0x00, 0x00, 0x01, 0x02],
        ];
        for payload in payloads {
            let encoded = encode(payload);
            assert_eq!(decode(&encoded).unwrap(), payload, "payload {payload:02x?}");
        }
    }

    #[test]
    fn leading_zero_bytes_become_ones() {
        // One version zero byte plus 19 zero bytes of hash: the string
        // must start with exactly 20 '1' characters (the 21st byte is
        // non-zero).
        let mut payload = vec![0u8; 20];
        payload.push(0x42);
        let encoded = encode(&payload);
        assert!(encoded.starts_with(&"1".repeat(20)));
        assert!(!encoded.starts_with(&"1".repeat(21)));
        assert_eq!(decode(&encoded).unwrap(), payload);
    }

    #[test]
    fn known_address_vector() {
        // 0x00 || HASH160 for the address 1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2.
        let mut payload = vec![0x00];
        payload.extend_from_slice(&[
            0x62, 0xE9, 0x07, 0xB1, 0x5C, 0xBF, 0x27, 0xD5, 0x42, 0x53, 0x99, 0xEB, 0xF6, 0xF0,
            0xFB, 0x50, 0xEB, 0xB8, 0x8F, 0x18,
        ]);
        assert_eq!(encode(&payload), "1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2");
        assert_eq!(
            decode("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2").unwrap(),
            payload
        );
    }

    #[test]
    fn rejects_characters_outside_the_alphabet() {
        for bad in ["0", "O", "I", "l", "1Bv BMS", "abc+def"] {
            assert!(matches!(
                decode(bad),
                Err(Error::InvalidFormat("character outside base58 alphabet"))
            ));
        }
    }

    #[test]
    fn rejects_corrupted_checksum() {
        let mut encoded = encode(b"payload").into_bytes();
        // Swap the last character for a different alphabet member.
        let last = *encoded.last().unwrap();
        *encoded.last_mut().unwrap() = if last == b'2' { b'3' } else { b'2' };
        let corrupted = String::from_utf8(encoded).unwrap();
        assert!(matches!(
            decode(&corrupted),
            Err(Error::InvalidChecksum("base58check"))
        ));
    }

    #[test]
    fn rejects_truncated_strings() {
        assert!(matches!(
            decode("11"),
            Err(Error::InvalidFormat("base58check payload too short"))
        ));
    }
}
