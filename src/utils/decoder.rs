//! Transaction decoder module
//! Parses calldata into the operations the risk scorer cares about
//! (approvals, ownership changes, arbitrary execution, transfers, swaps)
//! and encodes the swap calls the advisory facade builds.

use crate::models::types::SwapParams;
use alloy_primitives::{Address, U256};
use alloy_sol_types::{sol, SolCall};

// ERC-20 / ERC-721 / ERC-2612 surface
sol! {
    function approve(address spender, uint256 amount) external returns (bool);

    function increaseAllowance(address spender, uint256 addedValue) external returns (bool);

    function permit(
        address owner,
        address spender,
        uint256 value,
        uint256 deadline,
        uint8 v,
        bytes32 r,
        bytes32 s
    ) external;

    function setApprovalForAll(address operator, bool approved) external;

    function transfer(address to, uint256 amount) external returns (bool);

    function transferFrom(address from, address to, uint256 amount) external returns (bool);
}

// Ownership / proxy administration / arbitrary execution
sol! {
    function transferOwnership(address newOwner) external;

    function renounceOwnership() external;

    function upgradeTo(address newImplementation) external;

    function execute(address target, uint256 value, bytes calldata data) external payable returns (bytes memory);

    function multicall(bytes[] calldata data) external payable returns (bytes[] memory results);
}

// Uniswap V2 Router function signatures
sol! {
    function swapExactETHForTokens(
        uint256 amountOutMin,
        address[] calldata path,
        address to,
        uint256 deadline
    ) external payable returns (uint256[] memory amounts);

    function swapExactTokensForETH(
        uint256 amountIn,
        uint256 amountOutMin,
        address[] calldata path,
        address to,
        uint256 deadline
    ) external returns (uint256[] memory amounts);

    function swapExactTokensForTokens(
        uint256 amountIn,
        uint256 amountOutMin,
        address[] calldata path,
        address to,
        uint256 deadline
    ) external returns (uint256[] memory amounts);
}

/// An operation recognised in calldata
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedCall {
    Approve { spender: Address, amount: U256 },
    IncreaseAllowance { spender: Address, added: U256 },
    Permit { owner: Address, spender: Address, value: U256 },
    SetApprovalForAll { operator: Address, approved: bool },
    Transfer { to: Address, amount: U256 },
    TransferFrom { from: Address, to: Address, amount: U256 },
    TransferOwnership { new_owner: Address },
    RenounceOwnership,
    UpgradeTo { implementation: Address },
    Execute { target: Address, value: U256 },
    Multicall { calls: usize },
    Swap(SwapParams),
}

impl DecodedCall {
    /// Addresses embedded in the call, with the role they play
    pub fn embedded_addresses(&self) -> Vec<(&'static str, Address)> {
        match self {
            Self::Approve { spender, .. }
            | Self::IncreaseAllowance { spender, .. }
            | Self::Permit { spender, .. } => vec![("spender", *spender)],
            Self::SetApprovalForAll { operator, .. } => vec![("operator", *operator)],
            Self::Transfer { to, .. } => vec![("recipient", *to)],
            Self::TransferFrom { to, .. } => vec![("recipient", *to)],
            Self::TransferOwnership { new_owner } => vec![("new owner", *new_owner)],
            Self::UpgradeTo { implementation } => vec![("implementation", *implementation)],
            Self::Execute { target, .. } => vec![("call target", *target)],
            Self::RenounceOwnership | Self::Multicall { .. } | Self::Swap(_) => Vec::new(),
        }
    }

    /// Approved amount for approval-type calls.
    /// `setApprovalForAll(_, true)` maps to `U256::MAX`.
    pub fn approval_amount(&self) -> Option<U256> {
        match self {
            Self::Approve { amount, .. } => Some(*amount),
            Self::IncreaseAllowance { added, .. } => Some(*added),
            Self::Permit { value, .. } => Some(*value),
            Self::SetApprovalForAll { approved, .. } => {
                Some(if *approved { U256::MAX } else { U256::ZERO })
            }
            _ => None,
        }
    }

    /// Spender / operator of an approval-type call
    pub fn approval_spender(&self) -> Option<Address> {
        match self {
            Self::Approve { spender, .. }
            | Self::IncreaseAllowance { spender, .. }
            | Self::Permit { spender, .. } => Some(*spender),
            Self::SetApprovalForAll { operator, .. } => Some(*operator),
            _ => None,
        }
    }
}

/// Decoder for transaction calldata
pub struct CallDecoder;

impl CallDecoder {
    /// Leading 4-byte selector, or None when calldata is too short
    pub fn selector(calldata: &[u8]) -> Option<[u8; 4]> {
        calldata.get(..4).and_then(|s| s.try_into().ok())
    }

    /// Decode calldata into a known operation.
    /// Returns None for short calldata, unknown selectors, or arguments that
    /// do not match the selector's ABI.
    pub fn decode(calldata: &[u8], value: U256) -> Option<DecodedCall> {
        let selector = Self::selector(calldata)?;

        match selector {
            <approveCall as SolCall>::SELECTOR => {
                let call = approveCall::abi_decode(calldata, false).ok()?;
                Some(DecodedCall::Approve {
                    spender: call.spender,
                    amount: call.amount,
                })
            }
            <increaseAllowanceCall as SolCall>::SELECTOR => {
                let call = increaseAllowanceCall::abi_decode(calldata, false).ok()?;
                Some(DecodedCall::IncreaseAllowance {
                    spender: call.spender,
                    added: call.addedValue,
                })
            }
            <permitCall as SolCall>::SELECTOR => {
                let call = permitCall::abi_decode(calldata, false).ok()?;
                Some(DecodedCall::Permit {
                    owner: call.owner,
                    spender: call.spender,
                    value: call.value,
                })
            }
            <setApprovalForAllCall as SolCall>::SELECTOR => {
                let call = setApprovalForAllCall::abi_decode(calldata, false).ok()?;
                Some(DecodedCall::SetApprovalForAll {
                    operator: call.operator,
                    approved: call.approved,
                })
            }
            <transferCall as SolCall>::SELECTOR => {
                let call = transferCall::abi_decode(calldata, false).ok()?;
                Some(DecodedCall::Transfer {
                    to: call.to,
                    amount: call.amount,
                })
            }
            <transferFromCall as SolCall>::SELECTOR => {
                let call = transferFromCall::abi_decode(calldata, false).ok()?;
                Some(DecodedCall::TransferFrom {
                    from: call.from,
                    to: call.to,
                    amount: call.amount,
                })
            }
            <transferOwnershipCall as SolCall>::SELECTOR => {
                let call = transferOwnershipCall::abi_decode(calldata, false).ok()?;
                Some(DecodedCall::TransferOwnership {
                    new_owner: call.newOwner,
                })
            }
            <renounceOwnershipCall as SolCall>::SELECTOR => Some(DecodedCall::RenounceOwnership),
            <upgradeToCall as SolCall>::SELECTOR => {
                let call = upgradeToCall::abi_decode(calldata, false).ok()?;
                Some(DecodedCall::UpgradeTo {
                    implementation: call.newImplementation,
                })
            }
            <executeCall as SolCall>::SELECTOR => {
                let call = executeCall::abi_decode(calldata, false).ok()?;
                Some(DecodedCall::Execute {
                    target: call.target,
                    value: call.value,
                })
            }
            <multicallCall as SolCall>::SELECTOR => {
                let call = multicallCall::abi_decode(calldata, false).ok()?;
                Some(DecodedCall::Multicall {
                    calls: call.data.len(),
                })
            }
            _ => Self::decode_swap(calldata, value).map(DecodedCall::Swap),
        }
    }

    /// Decode swap parameters from Uniswap V2 router calldata
    pub fn decode_swap(calldata: &[u8], value: U256) -> Option<SwapParams> {
        Self::try_decode_swap_exact_eth_for_tokens(calldata, value)
            .or_else(|| Self::try_decode_swap_exact_tokens_for_eth(calldata))
            .or_else(|| Self::try_decode_swap_exact_tokens_for_tokens(calldata))
    }

    fn try_decode_swap_exact_eth_for_tokens(data: &[u8], value: U256) -> Option<SwapParams> {
        let call = swapExactETHForTokensCall::abi_decode(data, false).ok()?;
        Some(SwapParams {
            amount_in: value,
            amount_out_min: call.amountOutMin,
            path: call.path,
            to: call.to,
            deadline: call.deadline,
        })
    }

    fn try_decode_swap_exact_tokens_for_eth(data: &[u8]) -> Option<SwapParams> {
        let call = swapExactTokensForETHCall::abi_decode(data, false).ok()?;
        Some(SwapParams {
            amount_in: call.amountIn,
            amount_out_min: call.amountOutMin,
            path: call.path,
            to: call.to,
            deadline: call.deadline,
        })
    }

    fn try_decode_swap_exact_tokens_for_tokens(data: &[u8]) -> Option<SwapParams> {
        let call = swapExactTokensForTokensCall::abi_decode(data, false).ok()?;
        Some(SwapParams {
            amount_in: call.amountIn,
            amount_out_min: call.amountOutMin,
            path: call.path,
            to: call.to,
            deadline: call.deadline,
        })
    }

    /// Last 32-byte word of calldata as an integer.
    /// Used to recover the amount of an approval whose arguments are truncated.
    pub fn trailing_word(calldata: &[u8]) -> Option<U256> {
        if calldata.len() < 4 + 32 {
            return None;
        }
        let word = &calldata[calldata.len() - 32..];
        Some(U256::from_be_slice(word))
    }
}

/// Selector and canonical signature of every call this module understands
pub fn known_selectors() -> Vec<([u8; 4], &'static str)> {
    vec![
        (approveCall::SELECTOR, approveCall::SIGNATURE),
        (increaseAllowanceCall::SELECTOR, increaseAllowanceCall::SIGNATURE),
        (permitCall::SELECTOR, permitCall::SIGNATURE),
        (setApprovalForAllCall::SELECTOR, setApprovalForAllCall::SIGNATURE),
        (transferCall::SELECTOR, transferCall::SIGNATURE),
        (transferFromCall::SELECTOR, transferFromCall::SIGNATURE),
        (transferOwnershipCall::SELECTOR, transferOwnershipCall::SIGNATURE),
        (renounceOwnershipCall::SELECTOR, renounceOwnershipCall::SIGNATURE),
        (upgradeToCall::SELECTOR, upgradeToCall::SIGNATURE),
        (executeCall::SELECTOR, executeCall::SIGNATURE),
        (multicallCall::SELECTOR, multicallCall::SIGNATURE),
        (swapExactETHForTokensCall::SELECTOR, swapExactETHForTokensCall::SIGNATURE),
        (swapExactTokensForETHCall::SELECTOR, swapExactTokensForETHCall::SIGNATURE),
        (swapExactTokensForTokensCall::SELECTOR, swapExactTokensForTokensCall::SIGNATURE),
    ]
}

/// Encoder for the swap calls built by the advisory facade
pub struct SwapEncoder;

impl SwapEncoder {
    /// Encode a router swap. `native_in` selects the payable ETH variant.
    pub fn encode(params: &SwapParams, native_in: bool, native_out: bool) -> Vec<u8> {
        if native_in {
            swapExactETHForTokensCall {
                amountOutMin: params.amount_out_min,
                path: params.path.clone(),
                to: params.to,
                deadline: params.deadline,
            }
            .abi_encode()
        } else if native_out {
            swapExactTokensForETHCall {
                amountIn: params.amount_in,
                amountOutMin: params.amount_out_min,
                path: params.path.clone(),
                to: params.to,
                deadline: params.deadline,
            }
            .abi_encode()
        } else {
            swapExactTokensForTokensCall {
                amountIn: params.amount_in,
                amountOutMin: params.amount_out_min,
                path: params.path.clone(),
                to: params.to,
                deadline: params.deadline,
            }
            .abi_encode()
        }
    }

    /// Encode an ERC-20 approval
    pub fn encode_approve(spender: Address, amount: U256) -> Vec<u8> {
        approveCall { spender, amount }.abi_encode()
    }
}
