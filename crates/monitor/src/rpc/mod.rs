use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_client::GetConfirmedSignaturesForAddress2Config;
use solana_client::rpc_config::RpcTransactionConfig;
use solana_client::rpc_request::TokenAccountsFilter;
use solana_client::rpc_response::RpcConfirmedTransactionStatusWithSignature;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::system_program;
use solana_transaction_status::{
    EncodedConfirmedTransactionWithStatusMeta, EncodedTransaction, UiInstruction, UiMessage,
    UiParsedInstruction, UiTransactionEncoding,
};
use tracing::debug;
use transfer_watch_domain::config::ApiConfig;
use transfer_watch_domain::model::{AssetType, TransactionRecord, WatchedAddress};

use crate::session::MonitorError;

mod types;

pub use types::{NativeTransferInfo, TokenAmount, TokenTransferInfo, TransferInstruction};

const RPC_TIMEOUT: Duration = Duration::from_secs(15);

/// Looks up the most recent transfer of one asset into a recipient.
#[async_trait]
pub trait TransferSource: Send + Sync {
    async fn latest_transfer(
        &self,
        recipient: &WatchedAddress,
        asset: AssetType,
    ) -> Result<Option<TransactionRecord>, MonitorError>;
}

/// `TransferSource` backed by the Solana SDK's nonblocking RPC client.
pub struct RpcTransferSource {
    client: RpcClient,
    usdc_mint: Pubkey,
    commitment: CommitmentConfig,
}

pub fn build_rpc_source(config: &ApiConfig) -> Result<RpcTransferSource, MonitorError> {
    RpcTransferSource::new(
        config.solana_rpc_url(),
        config.usdc_mint_address(),
        config.commitment(),
    )
}

impl RpcTransferSource {
    pub fn new(
        url: impl Into<String>,
        mint: &str,
        commitment_level: &str,
    ) -> Result<Self, MonitorError> {
        let usdc_mint = Pubkey::from_str(mint)
            .map_err(|err| MonitorError::InvalidSetting(format!("USDC mint `{mint}`: {err}")))?;
        let commitment = CommitmentConfig::from_str(commitment_level).map_err(|_| {
            MonitorError::InvalidSetting(format!("commitment level `{commitment_level}`"))
        })?;
        let client =
            RpcClient::new_with_timeout_and_commitment(url.into(), RPC_TIMEOUT, commitment);

        Ok(Self {
            client,
            usdc_mint,
            commitment,
        })
    }

    async fn latest_signature(
        &self,
        address: &Pubkey,
    ) -> Result<Option<RpcConfirmedTransactionStatusWithSignature>, MonitorError> {
        let config = GetConfirmedSignaturesForAddress2Config {
            limit: Some(1),
            commitment: Some(self.commitment),
            ..Default::default()
        };
        let signatures = self
            .client
            .get_signatures_for_address_with_config(address, config)
            .await?;
        Ok(signatures.into_iter().next())
    }

    async fn parsed_transaction(
        &self,
        signature: &str,
    ) -> Result<EncodedConfirmedTransactionWithStatusMeta, MonitorError> {
        let signature = Signature::from_str(signature)
            .map_err(|err| MonitorError::Rpc(format!("invalid signature `{signature}`: {err}")))?;
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::JsonParsed),
            commitment: Some(self.commitment),
            max_supported_transaction_version: Some(0),
        };
        Ok(self
            .client
            .get_transaction_with_config(&signature, config)
            .await?)
    }

    /// Transaction time, then signature time, then `getBlockTime`, then `0`.
    async fn block_time(
        &self,
        status: &RpcConfirmedTransactionStatusWithSignature,
        tx: &EncodedConfirmedTransactionWithStatusMeta,
    ) -> i64 {
        if let Some(time) = tx.block_time.or(status.block_time) {
            return time;
        }
        match self.client.get_block_time(tx.slot).await {
            Ok(time) => time,
            Err(err) => {
                debug!(slot = tx.slot, %err, "block time unavailable");
                0
            }
        }
    }

    /// Resolves the status and parsed transaction for the newest successful
    /// activity on `address`.
    async fn latest_transaction(
        &self,
        address: &Pubkey,
    ) -> Result<
        Option<(
            RpcConfirmedTransactionStatusWithSignature,
            EncodedConfirmedTransactionWithStatusMeta,
        )>,
        MonitorError,
    > {
        let Some(status) = self.latest_signature(address).await? else {
            debug!(%address, "no signatures found");
            return Ok(None);
        };
        if status.err.is_some() {
            debug!(signature = %status.signature, "latest transaction failed on chain");
            return Ok(None);
        }
        let tx = self.parsed_transaction(&status.signature).await?;
        Ok(Some((status, tx)))
    }

    async fn latest_usdc_transfer(
        &self,
        recipient: &WatchedAddress,
    ) -> Result<Option<TransactionRecord>, MonitorError> {
        let accounts = self
            .client
            .get_token_accounts_by_owner(
                recipient.pubkey(),
                TokenAccountsFilter::Mint(self.usdc_mint),
            )
            .await?;
        let Some(account) = accounts.into_iter().next() else {
            debug!(recipient = %recipient, "no USDC token accounts found");
            return Ok(None);
        };
        let account_key = Pubkey::from_str(&account.pubkey).map_err(|err| {
            MonitorError::Rpc(format!("invalid token account `{}`: {err}", account.pubkey))
        })?;

        let Some((status, tx)) = self.latest_transaction(&account_key).await? else {
            return Ok(None);
        };
        let Some(transfer) = find_token_transfer(&tx, &self.usdc_mint.to_string()) else {
            return Ok(None);
        };
        let amount = token_amount_to_decimal(&transfer.token_amount)?;
        let time = self.block_time(&status, &tx).await;

        Ok(Some(TransactionRecord {
            tx_hash: status.signature,
            from: transfer.source,
            to: transfer.destination,
            amount,
            address: recipient.to_string(),
            time,
            asset: AssetType::Usdc,
        }))
    }

    async fn latest_sol_transfer(
        &self,
        recipient: &WatchedAddress,
    ) -> Result<Option<TransactionRecord>, MonitorError> {
        let Some((status, tx)) = self.latest_transaction(recipient.pubkey()).await? else {
            return Ok(None);
        };
        let Some(transfer) = find_native_transfer(&tx) else {
            return Ok(None);
        };
        let time = self.block_time(&status, &tx).await;

        Ok(Some(TransactionRecord {
            tx_hash: status.signature,
            from: transfer.source,
            to: transfer.destination,
            amount: lamports_to_sol(transfer.lamports),
            address: recipient.to_string(),
            time,
            asset: AssetType::Sol,
        }))
    }
}

#[async_trait]
impl TransferSource for RpcTransferSource {
    async fn latest_transfer(
        &self,
        recipient: &WatchedAddress,
        asset: AssetType,
    ) -> Result<Option<TransactionRecord>, MonitorError> {
        match asset {
            AssetType::Usdc => self.latest_usdc_transfer(recipient).await,
            AssetType::Sol => self.latest_sol_transfer(recipient).await,
        }
    }
}

/// Top-level jsonParsed instructions that decode as transfers, with the id of
/// the program that executed them.
fn transfer_instructions(
    tx: &EncodedConfirmedTransactionWithStatusMeta,
) -> Vec<(&str, TransferInstruction)> {
    let EncodedTransaction::Json(ui) = &tx.transaction.transaction else {
        return Vec::new();
    };
    let UiMessage::Parsed(message) = &ui.message else {
        return Vec::new();
    };

    message
        .instructions
        .iter()
        .filter_map(|instruction| match instruction {
            UiInstruction::Parsed(UiParsedInstruction::Parsed(parsed)) => {
                serde_json::from_value::<TransferInstruction>(parsed.parsed.clone())
                    .ok()
                    .map(|transfer| (parsed.program_id.as_str(), transfer))
            }
            _ => None,
        })
        .collect()
}

/// First `transferChecked` instruction moving the given mint.
pub(crate) fn find_token_transfer(
    tx: &EncodedConfirmedTransactionWithStatusMeta,
    mint: &str,
) -> Option<TokenTransferInfo> {
    transfer_instructions(tx)
        .into_iter()
        .find_map(|(_, instruction)| match instruction {
            TransferInstruction::TransferChecked(info) if info.mint == mint => Some(info),
            _ => None,
        })
}

/// First system-program `transfer` instruction.
pub(crate) fn find_native_transfer(
    tx: &EncodedConfirmedTransactionWithStatusMeta,
) -> Option<NativeTransferInfo> {
    let system = system_program::id().to_string();
    transfer_instructions(tx)
        .into_iter()
        .find_map(|(program_id, instruction)| match instruction {
            TransferInstruction::Transfer(info) if program_id == system => Some(info),
            _ => None,
        })
}

pub(crate) fn token_amount_to_decimal(amount: &TokenAmount) -> Result<f64, MonitorError> {
    let raw: u64 = amount
        .amount
        .parse()
        .map_err(|_| MonitorError::Rpc(format!("invalid token amount `{}`", amount.amount)))?;
    Ok(raw as f64 / 10f64.powi(i32::from(amount.decimals)))
}

pub(crate) fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}
