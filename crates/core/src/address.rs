use thiserror::Error;

use crate::script::{pay_to_pubkey_hash, pay_to_script_hash, ScriptError, HASH160_LEN};

/// Base58Check version prefixes for transparent addresses on one chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    pub pubkey_prefix: Vec<u8>,
    pub script_prefix: Vec<u8>,
}

impl Network {
    pub fn new(pubkey_prefix: impl Into<Vec<u8>>, script_prefix: impl Into<Vec<u8>>) -> Self {
        Network {
            pubkey_prefix: pubkey_prefix.into(),
            script_prefix: script_prefix.into(),
        }
    }

    /// Zcash mainnet (`t1...` / `t3...`).
    pub fn zcash_mainnet() -> Self {
        Network::new([0x1c, 0xb8], [0x1c, 0xbd])
    }

    /// Zcash testnet (`tm...` / `t2...`).
    pub fn zcash_testnet() -> Self {
        Network::new([0x1d, 0x25], [0x1c, 0xba])
    }

    pub fn bitcoin_mainnet() -> Self {
        Network::new([0x00], [0x05])
    }

    pub fn bitcoin_testnet() -> Self {
        Network::new([0x6f], [0xc4])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressType {
    P2PKH,
    P2SH,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAddress {
    pub address_type: AddressType,
    pub hash: [u8; HASH160_LEN],
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address is empty")]
    Empty,
    #[error("invalid base58check encoding")]
    InvalidBase58Check,
    #[error("unexpected address payload length: {0}")]
    InvalidPayloadLength(usize),
    #[error("address prefix does not belong to the configured network")]
    NetworkMismatch,
}

/// Decode a Base58Check transparent address into its kind and 20-byte hash.
pub fn parse_address(addr: &str, network: &Network) -> Result<ParsedAddress, AddressError> {
    let addr = addr.trim();
    if addr.is_empty() {
        return Err(AddressError::Empty);
    }

    let payload = bs58::decode(addr)
        .with_check(None)
        .into_vec()
        .map_err(|_| AddressError::InvalidBase58Check)?;

    let candidates = [
        (AddressType::P2PKH, network.pubkey_prefix.as_slice()),
        (AddressType::P2SH, network.script_prefix.as_slice()),
    ];

    let mut length_ok = false;
    for (address_type, prefix) in candidates {
        if payload.len() != prefix.len() + HASH160_LEN {
            continue;
        }
        length_ok = true;
        if let Some(body) = payload.strip_prefix(prefix) {
            let mut hash = [0u8; HASH160_LEN];
            hash.copy_from_slice(body);
            return Ok(ParsedAddress { address_type, hash });
        }
    }

    if length_ok {
        Err(AddressError::NetworkMismatch)
    } else {
        Err(AddressError::InvalidPayloadLength(payload.len()))
    }
}

/// Convert a parsed address to its scriptPubKey representation.
pub fn address_to_script_pubkey(parsed: &ParsedAddress) -> Result<Vec<u8>, ScriptError> {
    match parsed.address_type {
        AddressType::P2PKH => pay_to_pubkey_hash(&parsed.hash),
        AddressType::P2SH => pay_to_script_hash(&parsed.hash),
    }
}

/// Encode a hash as a Base58Check address for `network`.
pub fn encode_address(
    address_type: AddressType,
    hash: &[u8; HASH160_LEN],
    network: &Network,
) -> String {
    let prefix = match address_type {
        AddressType::P2PKH => &network.pubkey_prefix,
        AddressType::P2SH => &network.script_prefix,
    };
    let mut payload = Vec::with_capacity(prefix.len() + HASH160_LEN);
    payload.extend_from_slice(prefix);
    payload.extend_from_slice(hash);
    bs58::encode(payload).with_check().into_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_zcash_mainnet_p2pkh() {
        let network = Network::zcash_mainnet();
        let addr = encode_address(AddressType::P2PKH, &[0x11u8; 20], &network);
        assert!(addr.starts_with("t1"));
        let parsed = parse_address(&addr, &network).unwrap();
        assert_eq!(parsed.address_type, AddressType::P2PKH);
        assert_eq!(parsed.hash, [0x11u8; 20]);
    }

    #[test]
    fn parses_zcash_mainnet_p2sh() {
        let network = Network::zcash_mainnet();
        let addr = encode_address(AddressType::P2SH, &[0x22u8; 20], &network);
        assert!(addr.starts_with("t3"));
        let parsed = parse_address(&addr, &network).unwrap();
        assert_eq!(parsed.address_type, AddressType::P2SH);
        assert_eq!(parsed.hash, [0x22u8; 20]);
    }

    #[test]
    fn parses_zcash_testnet_address() {
        let network = Network::zcash_testnet();
        let addr = encode_address(AddressType::P2PKH, &[0x33u8; 20], &network);
        assert!(addr.starts_with("tm"));
        let parsed = parse_address(&addr, &network).unwrap();
        assert_eq!(parsed.address_type, AddressType::P2PKH);
    }

    #[test]
    fn parses_legacy_bitcoin_addresses() {
        let network = Network::bitcoin_mainnet();
        let p2pkh = parse_address("1BoatSLRHtKNngkdXEeobR76b53LETtpyT", &network).unwrap();
        assert_eq!(p2pkh.address_type, AddressType::P2PKH);
        let p2sh = parse_address("3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy", &network).unwrap();
        assert_eq!(p2sh.address_type, AddressType::P2SH);
    }

    #[test]
    fn rejects_wrong_network() {
        let addr = encode_address(AddressType::P2PKH, &[0x44u8; 20], &Network::zcash_mainnet());
        assert_eq!(
            parse_address(&addr, &Network::zcash_testnet()).unwrap_err(),
            AddressError::NetworkMismatch
        );
        // One-byte bitcoin prefixes leave a 22-byte zcash payload unexplained.
        assert_eq!(
            parse_address(&addr, &Network::bitcoin_mainnet()).unwrap_err(),
            AddressError::InvalidPayloadLength(22)
        );
    }

    #[test]
    fn rejects_invalid_checksum_and_empty() {
        let network = Network::zcash_mainnet();
        let mut addr = encode_address(AddressType::P2PKH, &[0x55u8; 20], &network);
        let last = addr.pop().unwrap();
        addr.push(if last == '1' { '2' } else { '1' });
        assert_eq!(
            parse_address(&addr, &Network::zcash_mainnet()).unwrap_err(),
            AddressError::InvalidBase58Check
        );
        assert_eq!(
            parse_address("", &Network::zcash_mainnet()).unwrap_err(),
            AddressError::Empty
        );
        assert_eq!(
            parse_address("0OIl", &Network::zcash_mainnet()).unwrap_err(),
            AddressError::InvalidBase58Check
        );
    }

    #[test]
    fn builds_script_pubkeys() {
        let p2pkh = ParsedAddress {
            address_type: AddressType::P2PKH,
            hash: [0u8; 20],
        };
        let spk = address_to_script_pubkey(&p2pkh).unwrap();
        assert_eq!(&spk[..3], &[0x76, 0xa9, 0x14]);
        assert_eq!(&spk[23..], &[0x88, 0xac]);

        let p2sh = ParsedAddress {
            address_type: AddressType::P2SH,
            hash: [1u8; 20],
        };
        let spk = address_to_script_pubkey(&p2sh).unwrap();
        assert_eq!(&spk[..2], &[0xa9, 0x14]);
        assert_eq!(spk[22], 0x87);
    }
}
