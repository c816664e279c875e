// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

// Engine defaults
pub const DEFAULT_MAX_CALL_DEPTH: usize = 64;
pub const DEFAULT_CHAIN_ID: u64 = 31_337;
pub const DEFAULT_LOG_LEVEL: &str = "info";

// Assets
pub const NATIVE_SYMBOL: &str = "ETH";

// Flash loans
pub const BPS_DENOMINATOR: u64 = 10_000;
/// Preimage of the ERC-3156 borrower acknowledgement.
pub const FLASH_CALLBACK_TAG: &str = "ERC3156FlashBorrower.onFlashLoan";

// Meta-transactions
pub const DEFAULT_FORWARDER_NAME: &str = "BasicForwarder";
pub const DEFAULT_FORWARDER_VERSION: &str = "1";
/// Bytes the forwarder appends to the outgoing calldata (the signer address).
pub const FORWARDED_SENDER_SUFFIX_LEN: usize = 20;

// Storage namespaces (hashed into slot keys)
pub const NONCE_NAMESPACE: &str = "forwarder.nonces";
pub const CLAIM_BITMAP_NAMESPACE: &str = "claims.bitmap";
pub const CLAIM_ROOT_NAMESPACE: &str = "claims.root";

/// Bits per claim bitmap word.
pub const CLAIM_WORD_BITS: u64 = 256;
