pub mod address;
pub mod coinbase;
pub mod error;
pub mod hash;
pub mod height;
pub mod reward;
pub mod script;
pub mod tx;

pub use address::{
    address_to_script_pubkey, encode_address, parse_address, AddressError, AddressType, Network,
    ParsedAddress,
};
pub use coinbase::{
    coinbase_script_sig, create_generation, masternode_total, select_version, Activation,
    BlockTemplate, ChainConfig, CoinbaseExtra, GenerationTx, MasternodeReward, DEFAULT_POOL_TAG,
};
pub use error::{CoinbaseError, Result};
pub use hash::{double_sha256, txid_to_hex};
pub use height::{decode_height, encode_height, height_push_len, HeightError};
pub use reward::{
    allocate, fee_percent, recipients_enabled, total_template_fees, Allocation, FeeRecipient,
    OutputSlot, RewardError,
};
pub use script::{pay_to_pubkey_hash, pay_to_script_hash, ScriptError};
pub use tx::{
    check_coinbase_script_sig, encode_varint, serialize_tx, tx_hash, TxError, TxInput, TxOutput,
    TxVersion,
};
