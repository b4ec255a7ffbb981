//! Claim contract interface.
//!
//! The contract surface is fixed: one state-changing operation (`claimUSDC`),
//! three read-only queries and four events. Only `claimUSDC` is ever sent as a
//! transaction; the view functions back the inspection endpoints.

use alloy::network::TransactionBuilder;
use alloy::primitives::{hex, keccak256, Address, Bytes, B256, U256};
use alloy::rpc::types::{Log, TransactionRequest};
use alloy::sol;
use alloy::sol_types::{SolCall, SolEvent};
use serde::Serialize;

use crate::blockchain::client::BlockchainClient;
use crate::blockchain::types::{BlockchainError, BlockchainResult, ClaimedEvent};

/// Version of the contract surface described here.
pub const DESCRIPTOR_VERSION: &str = "1";

sol! {
    /// QR code reward contract.
    #[derive(Debug)]
    contract QrCodeClaim {
        /// Emitted when a code is redeemed.
        event CodeClaimed(bytes32 indexed codeHash, address claimer);
        /// Emitted when the owner registers new codes.
        event CodesAdded(bytes32[] codeHashes);
        /// Emitted when the contract is funded.
        event USDCReceived(address indexed sender, uint256 amount);
        /// Emitted when the owner withdraws the remaining balance.
        event USDCWithdrawn(uint256 amount);

        function claimUSDC(string code) external;
        function isCodeValid(string code) external view returns (bool);
        function claimableAmount() external view returns (uint256);
        function getUSDCBalance() external view returns (uint256);
    }
}

/// Whether an operation changes state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mutability {
    NonPayable,
    View,
}

/// A callable contract function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationDescriptor {
    pub name: &'static str,
    pub signature: &'static str,
    pub selector: String,
    pub mutability: Mutability,
}

/// An event the contract emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventDescriptor {
    pub name: &'static str,
    pub signature: &'static str,
    pub topic: B256,
}

/// Fixed description of the deployed claim contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractDescriptor {
    pub version: &'static str,
    pub address: Address,
    pub operations: Vec<OperationDescriptor>,
    pub events: Vec<EventDescriptor>,
}

fn operation<C: SolCall>(name: &'static str, mutability: Mutability) -> OperationDescriptor {
    OperationDescriptor {
        name,
        signature: C::SIGNATURE,
        selector: hex::encode_prefixed(C::SELECTOR),
        mutability,
    }
}

fn event<E: SolEvent>(name: &'static str) -> EventDescriptor {
    EventDescriptor {
        name,
        signature: E::SIGNATURE,
        topic: E::SIGNATURE_HASH,
    }
}

impl ContractDescriptor {
    /// Describe the contract deployed at `address`.
    pub fn new(address: Address) -> Self {
        Self {
            version: DESCRIPTOR_VERSION,
            address,
            operations: vec![
                operation::<QrCodeClaim::claimUSDCCall>("claimUSDC", Mutability::NonPayable),
                operation::<QrCodeClaim::isCodeValidCall>("isCodeValid", Mutability::View),
                operation::<QrCodeClaim::claimableAmountCall>("claimableAmount", Mutability::View),
                operation::<QrCodeClaim::getUSDCBalanceCall>("getUSDCBalance", Mutability::View),
            ],
            events: vec![
                event::<QrCodeClaim::CodeClaimed>("CodeClaimed"),
                event::<QrCodeClaim::CodesAdded>("CodesAdded"),
                event::<QrCodeClaim::USDCReceived>("USDCReceived"),
                event::<QrCodeClaim::USDCWithdrawn>("USDCWithdrawn"),
            ],
        }
    }
}

/// Calldata for `claimUSDC(code)`.
pub fn claim_calldata(code: &str) -> Bytes {
    QrCodeClaim::claimUSDCCall {
        code: code.to_string(),
    }
    .abi_encode()
    .into()
}

/// Hash the contract stores and emits for a code.
pub fn code_hash(code: &str) -> B256 {
    keccak256(code.as_bytes())
}

/// Find the `CodeClaimed` event emitted by `contract` among receipt logs.
pub fn find_code_claimed(contract: Address, logs: &[Log]) -> Option<ClaimedEvent> {
    logs.iter()
        .filter(|log| log.address() == contract)
        .find_map(|log| log.log_decode::<QrCodeClaim::CodeClaimed>().ok())
        .map(|decoded| ClaimedEvent {
            code_hash: decoded.inner.data.codeHash,
            claimer: decoded.inner.data.claimer,
        })
}

/// Read-only access to the claim contract's view functions.
#[derive(Debug, Clone)]
pub struct ContractReader {
    client: BlockchainClient,
    address: Address,
}

impl ContractReader {
    pub fn new(client: BlockchainClient, address: Address) -> Self {
        Self { client, address }
    }

    async fn view<C: SolCall>(&self, call: C) -> BlockchainResult<C::Return> {
        let tx = TransactionRequest::default()
            .with_to(self.address)
            .with_input(call.abi_encode());
        let output = self.client.call(tx).await?;
        C::abi_decode_returns(&output)
            .map_err(|e| BlockchainError::Contract(format!("{}: {}", C::SIGNATURE, e)))
    }

    /// `isCodeValid(code)`.
    pub async fn is_code_valid(&self, code: &str) -> BlockchainResult<bool> {
        self.view(QrCodeClaim::isCodeValidCall {
            code: code.to_string(),
        })
        .await
    }

    /// `claimableAmount()`, in token base units.
    pub async fn claimable_amount(&self) -> BlockchainResult<U256> {
        self.view(QrCodeClaim::claimableAmountCall {}).await
    }

    /// `getUSDCBalance()`, in token base units.
    pub async fn usdc_balance(&self) -> BlockchainResult<U256> {
        self.view(QrCodeClaim::getUSDCBalanceCall {}).await
    }
}
