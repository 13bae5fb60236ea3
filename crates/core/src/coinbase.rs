use tracing::{debug, info};

use crate::{
    address::{address_to_script_pubkey, parse_address, Network},
    error::{CoinbaseError, Result},
    hash::txid_to_hex,
    height::encode_height,
    reward::{allocate, recipients_enabled, FeeRecipient, RewardError},
    tx::{check_coinbase_script_sig, serialize_tx, tx_hash, TxInput, TxOutput, TxVersion},
};

/// Pool identification written after the height when none is configured.
pub const DEFAULT_POOL_TAG: &[u8] =
    b"Default s-nomp pool https://github.com/s-nomp/s-nomp/wiki/Insight-pool-link";

/// Consensus limit on a single output script.
pub const MAX_SCRIPT_SIZE: usize = 10_000;

/// When a network upgrade applies: never, always, or from a height on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Activation {
    #[default]
    Disabled,
    Always,
    AtHeight(u32),
}

impl Activation {
    pub fn is_active(self, height: u32) -> bool {
        match self {
            Activation::Disabled => false,
            Activation::Always => true,
            Activation::AtHeight(activation) => activation <= height,
        }
    }
}

impl From<bool> for Activation {
    fn from(flag: bool) -> Self {
        if flag {
            Activation::Always
        } else {
            Activation::Disabled
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    pub network: Network,
    pub sapling: Activation,
    pub overwinter: Activation,
    pub burn_fees: bool,
}

/// Fixed payout mandated by the daemon, emitted verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasternodeReward {
    pub amount: u64,
    pub script: Vec<u8>,
}

/// The parts of a block template the coinbase depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockTemplate {
    pub height: u32,
    pub masternode_rewards: Vec<MasternodeReward>,
}

/// Pool payout address and the tag embedded in the scriptSig.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinbaseExtra {
    pub pool_address: String,
    pub pool_hex: Option<Vec<u8>>,
}

impl CoinbaseExtra {
    pub fn pool_tag(&self) -> &[u8] {
        self.pool_hex.as_deref().unwrap_or(DEFAULT_POOL_TAG)
    }
}

/// A serialized generation transaction and its hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationTx {
    pub version: TxVersion,
    pub tx: Vec<u8>,
    /// Double SHA-256 of `tx`, internal byte order.
    pub hash: [u8; 32],
    /// Outputs in serialized order: pool, recipients, masternodes.
    pub outputs: Vec<TxOutput>,
}

impl GenerationTx {
    pub fn tx_hex(&self) -> String {
        hex::encode(&self.tx)
    }

    /// Display-order txid.
    pub fn txid_hex(&self) -> String {
        txid_to_hex(&self.hash)
    }

    /// Hash in internal byte order, as merkle branches consume it.
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

/// Sapling wins over Overwinter when both are active.
pub fn select_version(config: &ChainConfig, height: u32) -> TxVersion {
    if config.sapling.is_active(height) {
        TxVersion::Sapling
    } else if config.overwinter.is_active(height) {
        TxVersion::Overwinter
    } else {
        TxVersion::Base
    }
}

/// scriptSig of the coinbase input: encoded height followed by the pool tag.
pub fn coinbase_script_sig(height: u32, pool_tag: &[u8]) -> Vec<u8> {
    let mut script_sig = encode_height(height);
    script_sig.extend_from_slice(pool_tag);
    script_sig
}

/// Check masternode scripts and return the sum of their amounts.
pub fn masternode_total(rewards: &[MasternodeReward]) -> Result<u64> {
    let mut sum = 0u64;
    for (index, reward) in rewards.iter().enumerate() {
        if reward.script.is_empty() || reward.script.len() > MAX_SCRIPT_SIZE {
            return Err(CoinbaseError::MalformedMasternodeScript { index });
        }
        sum = sum
            .checked_add(reward.amount)
            .ok_or(RewardError::AmountTooLarge)?;
    }
    Ok(sum)
}

/// Build the generation transaction for one block template.
///
/// Outputs are laid out as pool, fee recipients in list order, then
/// masternode payees in template order. Masternode amounts come off
/// `block_reward` before the percentage split.
pub fn create_generation(
    template: &BlockTemplate,
    block_reward: u64,
    fee_reward: u64,
    recipients: &[FeeRecipient],
    extra: &CoinbaseExtra,
    config: &ChainConfig,
) -> Result<GenerationTx> {
    let pool = parse_address(&extra.pool_address, &config.network)
        .map_err(CoinbaseError::PoolAddress)?;

    let version = select_version(config, template.height);
    debug!(height = template.height, ?version, "selected coinbase version");

    let script_sig = coinbase_script_sig(template.height, extra.pool_tag());
    check_coinbase_script_sig(&script_sig)?;
    let input = TxInput::coinbase(script_sig);

    let masternodes = masternode_total(&template.masternode_rewards)?;
    let total = block_reward
        .checked_sub(masternodes)
        .ok_or(CoinbaseError::InsufficientReward {
            masternodes,
            total: block_reward,
        })?;

    let allocation = allocate(total, fee_reward, recipients, config.burn_fees)?;

    let mut outputs = Vec::with_capacity(
        1 + allocation.recipients.len() + template.masternode_rewards.len(),
    );
    outputs.push(TxOutput {
        script_pubkey: address_to_script_pubkey(&pool)?,
        amount: allocation.pool,
    });
    debug!(amount = allocation.pool, "pool output");

    if recipients_enabled(recipients) {
        for (index, (recipient, &amount)) in
            recipients.iter().zip(&allocation.recipients).enumerate()
        {
            let parsed = parse_address(&recipient.address, &config.network)
                .map_err(|source| CoinbaseError::RecipientAddress { index, source })?;
            debug!(index, amount, address = %recipient.address, "fee recipient output");
            outputs.push(TxOutput {
                script_pubkey: address_to_script_pubkey(&parsed)?,
                amount,
            });
        }
    }

    for reward in &template.masternode_rewards {
        outputs.push(TxOutput {
            script_pubkey: reward.script.clone(),
            amount: reward.amount,
        });
    }

    let tx = serialize_tx(version, &[input], &outputs)?;
    let hash = tx_hash(&tx);
    let generation = GenerationTx {
        version,
        tx,
        hash,
        outputs,
    };

    info!(
        height = template.height,
        ?version,
        outputs = generation.outputs.len(),
        txid = %generation.txid_hex(),
        "built coinbase transaction"
    );

    Ok(generation)
}
