use crate::{address::AddressError, reward::RewardError, script::ScriptError, tx::TxError};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CoinbaseError {
    #[error("pool address: {0}")]
    PoolAddress(#[source] AddressError),
    #[error("recipients[{index}] address: {source}")]
    RecipientAddress {
        index: usize,
        #[source]
        source: AddressError,
    },
    #[error("masternode reward {index} has a malformed script")]
    MalformedMasternodeScript { index: usize },
    #[error("masternode rewards ({masternodes}) exceed the block reward ({total})")]
    InsufficientReward { masternodes: u64, total: u64 },
    #[error("reward error: {0}")]
    Reward(#[from] RewardError),
    #[error("script error: {0}")]
    Script(#[from] ScriptError),
    #[error("transaction error: {0}")]
    Tx(#[from] TxError),
}

pub type Result<T> = core::result::Result<T, CoinbaseError>;
