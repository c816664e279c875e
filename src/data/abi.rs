// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use alloy::sol;

sol! {
    interface IERC3156FlashBorrower {
        function onFlashLoan(
            address initiator,
            address token,
            uint256 amount,
            uint256 fee,
            bytes calldata data
        ) external returns (bytes32);
    }

    #[derive(Debug, PartialEq, Eq)]
    struct ForwardRequest {
        address from;
        address target;
        uint256 value;
        uint256 nonce;
        bytes data;
        uint256 deadline;
    }
}
