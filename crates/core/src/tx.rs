use thiserror::Error;

use crate::hash::double_sha256;

/// Coinbase inputs spend the null outpoint at this index.
pub const COINBASE_PREV_INDEX: u32 = 0xffff_ffff;
pub const COINBASE_SEQUENCE: u32 = 0xffff_ffff;

/// Consensus bounds on the coinbase scriptSig length.
pub const MIN_COINBASE_SCRIPT_SIG: usize = 2;
pub const MAX_COINBASE_SCRIPT_SIG: usize = 100;

/// High bit of the header marking Overwinter-and-later transactions.
pub const OVERWINTERED_FLAG: u32 = 1 << 31;
pub const OVERWINTER_VERSION_GROUP_ID: u32 = 0x03c4_8270;
pub const SAPLING_VERSION_GROUP_ID: u32 = 0x892f_2085;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxVersion {
    /// Plain version 1 transaction.
    Base,
    /// Version 3, Overwinter.
    Overwinter,
    /// Version 4, Sapling.
    Sapling,
}

impl TxVersion {
    pub fn number(self) -> u32 {
        match self {
            TxVersion::Base => 1,
            TxVersion::Overwinter => 3,
            TxVersion::Sapling => 4,
        }
    }

    /// The 4-byte header as written on the wire.
    pub fn header(self) -> u32 {
        match self {
            TxVersion::Base => self.number(),
            TxVersion::Overwinter | TxVersion::Sapling => self.number() | OVERWINTERED_FLAG,
        }
    }

    pub fn version_group_id(self) -> Option<u32> {
        match self {
            TxVersion::Base => None,
            TxVersion::Overwinter => Some(OVERWINTER_VERSION_GROUP_ID),
            TxVersion::Sapling => Some(SAPLING_VERSION_GROUP_ID),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInput {
    pub prev_txid: [u8; 32],
    pub prev_vout: u32,
    pub script_sig: Vec<u8>,
    pub sequence: u32,
}

impl TxInput {
    /// The single input of a generation transaction.
    pub fn coinbase(script_sig: Vec<u8>) -> Self {
        TxInput {
            prev_txid: [0u8; 32],
            prev_vout: COINBASE_PREV_INDEX,
            script_sig,
            sequence: COINBASE_SEQUENCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    pub script_pubkey: Vec<u8>,
    pub amount: u64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TxError {
    #[error("transaction has no inputs")]
    NoInputs,
    #[error("transaction has no outputs")]
    NoOutputs,
    #[error("coinbase scriptSig must be 2..=100 bytes, got {0}")]
    CoinbaseScriptSigLength(usize),
}

/// Bitcoin varint encoding (CompactSize).
pub fn encode_varint(n: u64) -> Vec<u8> {
    match n {
        0..=0xfc => vec![n as u8],
        0xfd..=0xffff => {
            let mut out = vec![0xfd];
            out.extend_from_slice(&(n as u16).to_le_bytes());
            out
        }
        0x1_0000..=0xffff_ffff => {
            let mut out = vec![0xfe];
            out.extend_from_slice(&(n as u32).to_le_bytes());
            out
        }
        _ => {
            let mut out = vec![0xff];
            out.extend_from_slice(&n.to_le_bytes());
            out
        }
    }
}

/// Check a coinbase scriptSig against the consensus length bounds.
pub fn check_coinbase_script_sig(script_sig: &[u8]) -> Result<(), TxError> {
    if !(MIN_COINBASE_SCRIPT_SIG..=MAX_COINBASE_SCRIPT_SIG).contains(&script_sig.len()) {
        return Err(TxError::CoinbaseScriptSigLength(script_sig.len()));
    }
    Ok(())
}

fn write_input(buf: &mut Vec<u8>, input: &TxInput) {
    buf.extend_from_slice(&input.prev_txid);
    buf.extend_from_slice(&input.prev_vout.to_le_bytes());
    buf.extend(encode_varint(input.script_sig.len() as u64));
    buf.extend_from_slice(&input.script_sig);
    buf.extend_from_slice(&input.sequence.to_le_bytes());
}

fn write_output(buf: &mut Vec<u8>, output: &TxOutput) {
    buf.extend_from_slice(&output.amount.to_le_bytes());
    buf.extend(encode_varint(output.script_pubkey.len() as u64));
    buf.extend_from_slice(&output.script_pubkey);
}

/// Serialize a transparent-only transaction in the format of `version`.
///
/// Lock time and expiry height are zero; shielded sections are written empty.
pub fn serialize_tx(
    version: TxVersion,
    inputs: &[TxInput],
    outputs: &[TxOutput],
) -> Result<Vec<u8>, TxError> {
    if inputs.is_empty() {
        return Err(TxError::NoInputs);
    }
    if outputs.is_empty() {
        return Err(TxError::NoOutputs);
    }

    let mut buf = Vec::new();
    buf.extend_from_slice(&version.header().to_le_bytes());
    if let Some(group_id) = version.version_group_id() {
        buf.extend_from_slice(&group_id.to_le_bytes());
    }

    buf.extend(encode_varint(inputs.len() as u64));
    for input in inputs {
        write_input(&mut buf, input);
    }

    buf.extend(encode_varint(outputs.len() as u64));
    for output in outputs {
        write_output(&mut buf, output);
    }

    buf.extend_from_slice(&0u32.to_le_bytes()); // nLockTime

    match version {
        TxVersion::Base => {}
        TxVersion::Overwinter => {
            buf.extend_from_slice(&0u32.to_le_bytes()); // nExpiryHeight
            buf.extend(encode_varint(0)); // vJoinSplit
        }
        TxVersion::Sapling => {
            buf.extend_from_slice(&0u32.to_le_bytes()); // nExpiryHeight
            buf.extend_from_slice(&0i64.to_le_bytes()); // valueBalance
            buf.extend(encode_varint(0)); // vShieldedSpend
            buf.extend(encode_varint(0)); // vShieldedOutput
            buf.extend(encode_varint(0)); // vJoinSplit
        }
    }

    Ok(buf)
}

/// Transaction hash in internal byte order.
pub fn tx_hash(serialized: &[u8]) -> [u8; 32] {
    double_sha256(serialized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::txid_to_hex;
    use bitcoin::{consensus, Transaction};

    fn p2pkh_script(fill: u8) -> Vec<u8> {
        let mut script = vec![0x76, 0xa9, 0x14];
        script.extend(vec![fill; 20]);
        script.extend([0x88, 0xac]);
        script
    }

    fn sample_coinbase() -> (TxInput, Vec<TxOutput>) {
        let input = TxInput::coinbase(vec![0x03, 0x20, 0xa1, 0x07, 0x00, 0x2f, 0x70, 0x2f]);
        let outputs = vec![
            TxOutput {
                script_pubkey: p2pkh_script(0x11),
                amount: 1_000_000,
            },
            TxOutput {
                script_pubkey: p2pkh_script(0x22),
                amount: 25_000,
            },
        ];
        (input, outputs)
    }

    #[test]
    fn encodes_varints() {
        assert_eq!(encode_varint(0xfc), vec![0xfc]);
        assert_eq!(encode_varint(0xfd), vec![0xfd, 0xfd, 0x00]);
        assert_eq!(encode_varint(0xffff), vec![0xfd, 0xff, 0xff]);
        assert_eq!(encode_varint(0x1_0000), vec![0xfe, 0x00, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn coinbase_input_spends_null_outpoint() {
        let input = TxInput::coinbase(vec![0x01, 0x00]);
        assert_eq!(input.prev_txid, [0u8; 32]);
        assert_eq!(input.prev_vout, 0xffff_ffff);
        assert_eq!(input.sequence, 0xffff_ffff);
    }

    #[test]
    fn base_version_matches_bitcoin_crate() {
        let (input, outputs) = sample_coinbase();
        let raw = serialize_tx(TxVersion::Base, &[input.clone()], &outputs).unwrap();

        let tx: Transaction = consensus::deserialize(&raw).expect("transaction parses");
        assert!(tx.is_coinbase());
        assert_eq!(tx.version.0, 1);
        assert_eq!(tx.input[0].script_sig.as_bytes(), input.script_sig.as_slice());
        assert_eq!(tx.output.len(), 2);
        assert_eq!(tx.output[0].value.to_sat(), 1_000_000);
        assert_eq!(tx.output[1].script_pubkey.as_bytes(), outputs[1].script_pubkey.as_slice());

        assert_eq!(consensus::encode::serialize(&tx), raw);
        assert_eq!(tx.compute_txid().to_string(), txid_to_hex(&tx_hash(&raw)));
    }

    #[test]
    fn overwinter_layout() {
        let (input, outputs) = sample_coinbase();
        let base = serialize_tx(TxVersion::Base, &[input.clone()], &outputs).unwrap();
        let raw = serialize_tx(TxVersion::Overwinter, &[input], &outputs).unwrap();

        assert_eq!(hex::encode(&raw[..8]), "030000807082c403");
        // Same body as v1 after the header, plus expiry height and empty joinsplits.
        assert_eq!(&raw[8..8 + base.len() - 4], &base[4..]);
        assert_eq!(raw.len(), base.len() + 4 + 4 + 1);
        assert_eq!(&raw[raw.len() - 9..], &[0u8; 9]);
    }

    #[test]
    fn sapling_layout() {
        let (input, outputs) = sample_coinbase();
        let base = serialize_tx(TxVersion::Base, &[input.clone()], &outputs).unwrap();
        let raw = serialize_tx(TxVersion::Sapling, &[input], &outputs).unwrap();

        assert_eq!(hex::encode(&raw[..8]), "0400008085202f89");
        assert_eq!(&raw[8..8 + base.len() - 4], &base[4..]);
        // lock time, expiry, value balance, three empty vectors
        assert_eq!(raw.len(), base.len() + 4 + 4 + 8 + 3);
        assert_eq!(&raw[raw.len() - 19..], &[0u8; 19]);
    }

    #[test]
    fn sapling_serialization_matches_mainnet_transaction() {
        // Sapling v4 mainnet transaction carried in zebra's transparent address vectors.
        let reference = hex::decode(concat!(
            "0400008085202f8901fcaf44919d4a17f6181a02a7ebe0420be6f7dad1ef86755b81d5a9567456653c",
            "010000006a473044022035224ed7276e61affd53315eca059c92876bc2df61d84277cafd7af61d4dbf",
            "4002203ed72ea497a9f6b38eb29df08e830d99e32377edb8a574b8a289024f0241d7c40121031f54b0",
            "95eae066d96b2557c1f99e40e967978a5fd117465dbec0986ca74201a6feffffff020050d6dc010000",
            "0017a9141b8a9bda4b62cd0d0582b55455d0778c86f8628f870d03c812030000001976a914e4ff5512",
            "ffafe9287992a1cd177ca6e408e0300388ac62070d0095070d000000000000000000000000"
        ))
        .unwrap();

        let mut prev_txid = [0u8; 32];
        prev_txid.copy_from_slice(
            &hex::decode("fcaf44919d4a17f6181a02a7ebe0420be6f7dad1ef86755b81d5a9567456653c")
                .unwrap(),
        );
        let input = TxInput {
            prev_txid,
            prev_vout: 1,
            script_sig: hex::decode(concat!(
                "473044022035224ed7276e61affd53315eca059c92876bc2df61d84277cafd7af61d4dbf400220",
                "3ed72ea497a9f6b38eb29df08e830d99e32377edb8a574b8a289024f0241d7c40121031f54b095",
                "eae066d96b2557c1f99e40e967978a5fd117465dbec0986ca74201a6"
            ))
            .unwrap(),
            sequence: 0xffff_fffe,
        };
        let outputs = vec![
            TxOutput {
                script_pubkey: hex::decode("a9141b8a9bda4b62cd0d0582b55455d0778c86f8628f87")
                    .unwrap(),
                amount: 8_000_000_000,
            },
            TxOutput {
                script_pubkey: hex::decode("76a914e4ff5512ffafe9287992a1cd177ca6e408e0300388ac")
                    .unwrap(),
                amount: 13_199_999_757,
            },
        ];

        let mut raw = serialize_tx(TxVersion::Sapling, &[input], &outputs).unwrap();
        assert_eq!(raw.len(), reference.len());

        // Only nLockTime and nExpiryHeight differ; generated transactions leave both at zero.
        let tail = raw.len() - 19;
        assert_eq!(&raw[tail..tail + 8], &[0u8; 8]);
        raw[tail..tail + 4].copy_from_slice(&0x000d_0762u32.to_le_bytes());
        raw[tail + 4..tail + 8].copy_from_slice(&0x000d_0795u32.to_le_bytes());

        assert_eq!(raw, reference);
        assert_eq!(
            txid_to_hex(&tx_hash(&raw)),
            "00ce8def1a7b84e66da8ce06df1ed589c28b6c71e0608fdf1cc95643649e3b20"
        );
    }

    #[test]
    fn versions_report_headers() {
        assert_eq!(TxVersion::Base.header(), 1);
        assert_eq!(TxVersion::Overwinter.header(), 0x8000_0003);
        assert_eq!(TxVersion::Sapling.header(), 0x8000_0004);
        assert_eq!(TxVersion::Base.version_group_id(), None);
    }

    #[test]
    fn rejects_empty_transactions() {
        let (input, outputs) = sample_coinbase();
        assert_eq!(
            serialize_tx(TxVersion::Base, &[], &outputs).unwrap_err(),
            TxError::NoInputs
        );
        assert_eq!(
            serialize_tx(TxVersion::Sapling, &[input], &[]).unwrap_err(),
            TxError::NoOutputs
        );
    }

    #[test]
    fn checks_coinbase_script_sig_bounds() {
        assert!(check_coinbase_script_sig(&[0x01, 0x00]).is_ok());
        assert!(check_coinbase_script_sig(&[0u8; 100]).is_ok());
        assert_eq!(
            check_coinbase_script_sig(&[0x01]).unwrap_err(),
            TxError::CoinbaseScriptSigLength(1)
        );
        assert_eq!(
            check_coinbase_script_sig(&[0u8; 101]).unwrap_err(),
            TxError::CoinbaseScriptSigLength(101)
        );
    }
}
