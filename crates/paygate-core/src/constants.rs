//! Transfer and provider constants. Native values are in wei (1 ETH = 10^18 wei).

/// Decimals of the native asset on EVM chains.
pub const NATIVE_DECIMALS: u8 = 18;

/// Largest decimal precision a transfer amount may use.
///
/// 10^38 is the largest power of ten that fits in a `u128`.
pub const MAX_ASSET_DECIMALS: u8 = 38;

/// Length of an EVM account address in bytes.
pub const ADDRESS_LEN: usize = 20;

/// EIP-1193: the user rejected the request.
pub const USER_REJECTED_CODE: i64 = 4001;

/// EIP-1193: the provider is disconnected from all chains.
pub const DISCONNECTED_CODE: i64 = 4900;

/// EIP-1193: the provider is not connected to the requested chain.
pub const CHAIN_DISCONNECTED_CODE: i64 = 4901;

/// Message fragments wallets use when the user cancels a request.
///
/// Matched case-insensitively against backend error messages.
pub const USER_REJECTION_SIGNALS: &[&str] = &[
    "user rejected",
    "user denied",
    "user cancel",
    "rejected by user",
    "action_rejected",
];
