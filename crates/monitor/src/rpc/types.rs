//! Typed view of the `parsed` payload the node attaches to jsonParsed
//! instructions. Only the two transfer kinds the monitor reports are modelled;
//! anything else fails to decode and is skipped.

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "info", rename_all = "camelCase")]
pub enum TransferInstruction {
    Transfer(NativeTransferInfo),
    TransferChecked(TokenTransferInfo),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NativeTransferInfo {
    pub source: String,
    pub destination: String,
    pub lamports: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenTransferInfo {
    pub source: String,
    pub destination: String,
    pub mint: String,
    pub token_amount: TokenAmount,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenAmount {
    /// Raw integer amount, encoded as a string by the node.
    pub amount: String,
    pub decimals: u8,
}
