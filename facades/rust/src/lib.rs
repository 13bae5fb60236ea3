use thiserror::Error;
use tracing::{debug, warn};

use coinbase_gen_core::{
    create_generation as build_generation, fee_percent, parse_address, recipients_enabled,
    total_template_fees, Activation, AddressError, BlockTemplate, ChainConfig, CoinbaseError,
    CoinbaseExtra, FeeRecipient, GenerationTx, MasternodeReward, Network, RewardError,
};

#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkOption {
    /// Zcash mainnet transparent prefixes.
    Mainnet,
    /// Zcash testnet transparent prefixes.
    Testnet,
    BitcoinMainnet,
    BitcoinTestnet,
    /// Hex-encoded Base58Check version bytes for forks.
    Custom {
        pubkey_prefix: String,
        script_prefix: String,
    },
}

impl NetworkOption {
    fn to_core(&self) -> Result<Network> {
        match self {
            NetworkOption::Mainnet => Ok(Network::zcash_mainnet()),
            NetworkOption::Testnet => Ok(Network::zcash_testnet()),
            NetworkOption::BitcoinMainnet => Ok(Network::bitcoin_mainnet()),
            NetworkOption::BitcoinTestnet => Ok(Network::bitcoin_testnet()),
            NetworkOption::Custom {
                pubkey_prefix,
                script_prefix,
            } => {
                let pubkey = decode_prefix("pubkey_prefix", pubkey_prefix)?;
                let script = decode_prefix("script_prefix", script_prefix)?;
                if pubkey == script {
                    return Err(CoinbaseGenError::new(
                        CoinbaseGenErrorCode::InvalidInput,
                        "pubkey_prefix and script_prefix must differ",
                    ));
                }
                Ok(Network::new(pubkey, script))
            }
        }
    }
}

/// `true`/`false`, or the height the upgrade activates at.
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(untagged)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOption {
    Flag(bool),
    Height(u32),
}

impl Default for ActivationOption {
    fn default() -> Self {
        ActivationOption::Flag(false)
    }
}

impl From<ActivationOption> for Activation {
    fn from(value: ActivationOption) -> Self {
        match value {
            ActivationOption::Flag(flag) => Activation::from(flag),
            ActivationOption::Height(height) => Activation::AtHeight(height),
        }
    }
}

#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinOptions {
    pub network: NetworkOption,
    #[cfg_attr(feature = "serde", serde(default))]
    pub sapling: ActivationOption,
    #[cfg_attr(feature = "serde", serde(default))]
    pub overwinter: ActivationOption,
    #[cfg_attr(feature = "serde", serde(default))]
    pub burn_fees: bool,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct RecipientDesc {
    pub address: String,
    pub percent: f64,
}

#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct PoolOptions {
    pub coin: CoinOptions,
    pub pool_address: String,
    /// Hex bytes identifying the pool in the coinbase scriptSig.
    #[cfg_attr(feature = "serde", serde(default))]
    pub pool_hex: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub recipients: Vec<RecipientDesc>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasternodeRewardDesc {
    pub amount: u64,
    /// Hex-encoded output script, passed through as-is.
    pub script: String,
}

#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoinbaseTxnDesc {
    #[cfg_attr(feature = "serde", serde(default))]
    pub masternodes_rewards: Option<Vec<MasternodeRewardDesc>>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateTxDesc {
    #[cfg_attr(feature = "serde", serde(default))]
    pub fee: u64,
}

/// The subset of a `getblocktemplate` response the coinbase needs.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockTemplateDesc {
    pub height: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub coinbasetxn: Option<CoinbaseTxnDesc>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub transactions: Vec<TemplateTxDesc>,
}

impl BlockTemplateDesc {
    /// Sum of the fees of the template's transactions.
    pub fn total_fees(&self) -> Result<u64> {
        let fees: Vec<u64> = self.transactions.iter().map(|tx| tx.fee).collect();
        total_template_fees(&fees).map_err(map_reward_error)
    }

    fn masternode_rewards(&self) -> &[MasternodeRewardDesc] {
        self.coinbasetxn
            .as_ref()
            .and_then(|cb| cb.masternodes_rewards.as_deref())
            .unwrap_or(&[])
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRewardDesc {
    pub total: u64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDesc {
    pub script_pubkey: String,
    pub amount: u64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub tx_hex: String,
    /// Display-order transaction id.
    pub txid: String,
    /// Transaction hash in internal byte order.
    pub hash: String,
    pub version: u32,
    pub outputs: Vec<OutputDesc>,
}

impl From<GenerationTx> for GenerationResult {
    fn from(generation: GenerationTx) -> Self {
        GenerationResult {
            tx_hex: generation.tx_hex(),
            txid: generation.txid_hex(),
            hash: generation.hash_hex(),
            version: generation.version.number(),
            outputs: generation
                .outputs
                .into_iter()
                .map(|o| OutputDesc {
                    script_pubkey: hex::encode(o.script_pubkey),
                    amount: o.amount,
                })
                .collect(),
        }
    }
}

#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoinbaseGenErrorCode {
    InvalidAddress,
    UnsupportedAddressType,
    MalformedMasternodeScript,
    InvalidRecipients,
    NegativeAmount,
    RewardExceeded,
    InsufficientReward,
    InvalidInput,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Error)]
#[error("{code:?}: {message}")]
pub struct CoinbaseGenError {
    pub code: CoinbaseGenErrorCode,
    pub message: String,
}

type Result<T> = std::result::Result<T, CoinbaseGenError>;

impl CoinbaseGenError {
    fn new(code: CoinbaseGenErrorCode, message: impl Into<String>) -> Self {
        CoinbaseGenError {
            code,
            message: message.into(),
        }
    }
}

/// Pool-level coinbase configuration, validated once and reused for every
/// block template.
#[derive(Debug, Clone)]
pub struct CoinbaseBuilder {
    chain: ChainConfig,
    extra: CoinbaseExtra,
    recipients: Vec<FeeRecipient>,
}

impl CoinbaseBuilder {
    pub fn new(opts: PoolOptions) -> Result<Self> {
        let network = opts.coin.network.to_core()?;

        parse_address(&opts.pool_address, &network)
            .map_err(|err| map_address_error("pool address", err))?;

        let pool_hex = match opts.pool_hex.as_deref() {
            Some(hex_str) => Some(hex::decode(hex_str).map_err(|_| {
                CoinbaseGenError::new(
                    CoinbaseGenErrorCode::InvalidInput,
                    "pool_hex must be valid hex",
                )
            })?),
            None => {
                debug!("no pool_hex configured; using the default pool tag");
                None
            }
        };

        let recipients: Vec<FeeRecipient> = opts
            .recipients
            .into_iter()
            .map(|r| FeeRecipient::new(r.address, r.percent))
            .collect();
        fee_percent(&recipients).map_err(map_reward_error)?;

        if recipients_enabled(&recipients) {
            for (idx, recipient) in recipients.iter().enumerate() {
                parse_address(&recipient.address, &network)
                    .map_err(|err| map_address_error(&format!("recipients[{idx}] address"), err))?;
            }
        } else if !recipients.is_empty() {
            warn!("first recipient address is empty; recipient outputs are disabled");
        }

        let chain = ChainConfig {
            network,
            sapling: opts.coin.sapling.into(),
            overwinter: opts.coin.overwinter.into(),
            burn_fees: opts.coin.burn_fees,
        };

        Ok(CoinbaseBuilder {
            chain,
            extra: CoinbaseExtra {
                pool_address: opts.pool_address,
                pool_hex,
            },
            recipients,
        })
    }

    pub fn chain(&self) -> &ChainConfig {
        &self.chain
    }

    /// Build the generation transaction for `template`.
    pub fn build(
        &self,
        template: &BlockTemplateDesc,
        block_reward: &BlockRewardDesc,
        fee_reward: u64,
    ) -> Result<GenerationResult> {
        let core_template = BlockTemplate {
            height: template.height,
            masternode_rewards: parse_masternode_rewards(template.masternode_rewards())?,
        };

        let generation = build_generation(
            &core_template,
            block_reward.total,
            fee_reward,
            &self.recipients,
            &self.extra,
            &self.chain,
        )
        .map_err(map_coinbase_error)?;

        Ok(generation.into())
    }

    /// Build with `fee_reward` taken from the template's transaction fees.
    pub fn build_with_template_fees(
        &self,
        template: &BlockTemplateDesc,
        block_reward: &BlockRewardDesc,
    ) -> Result<GenerationResult> {
        let fee_reward = template.total_fees()?;
        self.build(template, block_reward, fee_reward)
    }
}

/// One-shot form of [`CoinbaseBuilder::build`].
pub fn create_generation(
    rpc_data: &BlockTemplateDesc,
    block_reward: &BlockRewardDesc,
    fee_reward: u64,
    recipients: &[RecipientDesc],
    pool_address: &str,
    pool_hex: Option<&str>,
    coin: &CoinOptions,
) -> Result<GenerationResult> {
    let builder = CoinbaseBuilder::new(PoolOptions {
        coin: coin.clone(),
        pool_address: pool_address.to_string(),
        pool_hex: pool_hex.map(str::to_string),
        recipients: recipients.to_vec(),
    })?;
    builder.build(rpc_data, block_reward, fee_reward)
}

fn decode_prefix(field: &str, value: &str) -> Result<Vec<u8>> {
    let bytes = hex::decode(value).map_err(|_| {
        CoinbaseGenError::new(
            CoinbaseGenErrorCode::InvalidInput,
            format!("{field} must be valid hex"),
        )
    })?;
    if bytes.is_empty() {
        return Err(CoinbaseGenError::new(
            CoinbaseGenErrorCode::InvalidInput,
            format!("{field} must not be empty"),
        ));
    }
    Ok(bytes)
}

fn parse_masternode_rewards(rewards: &[MasternodeRewardDesc]) -> Result<Vec<MasternodeReward>> {
    rewards
        .iter()
        .enumerate()
        .map(|(idx, reward)| {
            let script = hex::decode(&reward.script).map_err(|_| {
                CoinbaseGenError::new(
                    CoinbaseGenErrorCode::MalformedMasternodeScript,
                    format!("masternode reward {idx} script must be valid hex"),
                )
            })?;
            Ok(MasternodeReward {
                amount: reward.amount,
                script,
            })
        })
        .collect()
}

fn map_address_error(context: &str, err: AddressError) -> CoinbaseGenError {
    let code = match err {
        AddressError::NetworkMismatch => CoinbaseGenErrorCode::UnsupportedAddressType,
        _ => CoinbaseGenErrorCode::InvalidAddress,
    };
    CoinbaseGenError::new(code, format!("{context}: {err}"))
}

fn map_reward_error(err: RewardError) -> CoinbaseGenError {
    let code = match err {
        RewardError::InvalidPercent { .. } | RewardError::PercentOverflow(_) => {
            CoinbaseGenErrorCode::InvalidRecipients
        }
        RewardError::NegativeAmount(_) => CoinbaseGenErrorCode::NegativeAmount,
        RewardError::ExceedsReward { .. } => CoinbaseGenErrorCode::RewardExceeded,
        RewardError::AmountTooLarge => CoinbaseGenErrorCode::InvalidInput,
    };
    CoinbaseGenError::new(code, err.to_string())
}

fn map_coinbase_error(err: CoinbaseError) -> CoinbaseGenError {
    match err {
        CoinbaseError::PoolAddress(addr_err) => map_address_error("pool address", addr_err),
        CoinbaseError::RecipientAddress { index, source } => {
            map_address_error(&format!("recipients[{index}] address"), source)
        }
        CoinbaseError::MalformedMasternodeScript { .. } => CoinbaseGenError::new(
            CoinbaseGenErrorCode::MalformedMasternodeScript,
            err.to_string(),
        ),
        CoinbaseError::InsufficientReward { .. } => {
            CoinbaseGenError::new(CoinbaseGenErrorCode::InsufficientReward, err.to_string())
        }
        CoinbaseError::Reward(reward_err) => map_reward_error(reward_err),
        CoinbaseError::Script(_) | CoinbaseError::Tx(_) => {
            CoinbaseGenError::new(CoinbaseGenErrorCode::InvalidInput, err.to_string())
        }
    }
}
