//! Presentation projection.
//!
//! Everything a claim page renders is derived here from the attempt
//! snapshot, the wallet session and static config. Nothing is stored.

use serde::{Deserialize, Serialize};

use crate::claim::attempt::{ClaimAttempt, ClaimStatus};
use crate::claim::session::SessionSnapshot;
use crate::config::schema::ContractConfig;

pub const LABEL_CONNECT: &str = "Connect Wallet to Claim";
pub const LABEL_BUSY: &str = "claiming...";
pub const LABEL_CLAIMED: &str = "Claimed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Alert shown beneath the claim button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletView {
    pub connected: bool,
    pub address: Option<String>,
}

/// Rendered state of one claim page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimView {
    pub code: String,
    pub reward: String,
    pub attempt: ClaimAttempt,
    pub wallet: WalletView,
    pub can_submit: bool,
    pub busy: bool,
    pub button_label: String,
    pub notice: Option<Notice>,
    pub explorer_url: Option<String>,
}

impl ClaimView {
    pub fn project(
        code: &str,
        attempt: &ClaimAttempt,
        session: SessionSnapshot,
        contract: &ContractConfig,
    ) -> Self {
        let connected = session.signing_address().is_some();
        let busy = attempt.status.is_in_flight();

        let button_label = if !connected {
            LABEL_CONNECT.to_string()
        } else {
            match attempt.status {
                ClaimStatus::Submitting | ClaimStatus::AwaitingConfirmation => LABEL_BUSY.to_string(),
                ClaimStatus::Confirmed => LABEL_CLAIMED.to_string(),
                ClaimStatus::Idle | ClaimStatus::Failed => format!("Claim {}", contract.token_symbol),
            }
        };

        let notice = match attempt.status {
            ClaimStatus::Confirmed => Some(Notice {
                level: NoticeLevel::Success,
                message: format!("Successfully claimed {}!", contract.reward_label()),
            }),
            ClaimStatus::Failed => attempt.failure.as_ref().map(|failure| Notice {
                level: NoticeLevel::Error,
                message: failure.message.clone(),
            }),
            _ if !connected => Some(Notice {
                level: NoticeLevel::Info,
                message: format!(
                    "Please connect your wallet to claim your {} reward.",
                    contract.token_symbol
                ),
            }),
            _ => None,
        };

        let explorer_url = attempt
            .transaction_id
            .as_ref()
            .map(|tx| format!("{}{}", contract.explorer_tx_url, tx));

        Self {
            code: code.to_string(),
            reward: contract.reward_label(),
            attempt: attempt.clone(),
            wallet: WalletView {
                connected,
                address: session.display_address(),
            },
            can_submit: connected && !code.is_empty() && attempt.status == ClaimStatus::Idle,
            busy,
            button_label,
            notice,
            explorer_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::types::TransactionId;
    use crate::claim::attempt::Code;
    use crate::claim::classifier::{ClassifiedError, FailureCategory};
    use alloy::primitives::address;

    fn connected() -> SessionSnapshot {
        SessionSnapshot::connected(address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266"))
    }

    #[test]
    fn test_idle_connected() {
        let view = ClaimView::project(
            "ABC123",
            &ClaimAttempt::idle(),
            connected(),
            &ContractConfig::default(),
        );
        assert!(view.can_submit);
        assert!(!view.busy);
        assert_eq!(view.button_label, "Claim USDC");
        assert_eq!(view.reward, "1 USDC");
        assert_eq!(view.notice, None);
        assert_eq!(view.wallet.address.as_deref(), Some("0xf39F…2266"));
    }

    #[test]
    fn test_disconnected_asks_for_wallet() {
        let view = ClaimView::project(
            "ABC123",
            &ClaimAttempt::idle(),
            SessionSnapshot::disconnected(),
            &ContractConfig::default(),
        );
        assert!(!view.can_submit);
        assert_eq!(view.button_label, LABEL_CONNECT);
        let notice = view.notice.unwrap();
        assert_eq!(notice.level, NoticeLevel::Info);
        assert!(notice.message.contains("connect your wallet"));
    }

    #[test]
    fn test_busy_follows_status() {
        let mut attempt = ClaimAttempt::submitting(Code::new("ABC123").unwrap());
        let view = ClaimView::project("ABC123", &attempt, connected(), &ContractConfig::default());
        assert!(view.busy && !view.can_submit);
        assert_eq!(view.button_label, LABEL_BUSY);

        attempt.status = ClaimStatus::AwaitingConfirmation;
        attempt.transaction_id = Some(TransactionId::new("0xabc"));
        let view = ClaimView::project("ABC123", &attempt, connected(), &ContractConfig::default());
        assert!(view.busy);
        assert_eq!(
            view.explorer_url.as_deref(),
            Some("https://basescan.org/tx/0xabc")
        );
    }

    #[test]
    fn test_terminal_notices() {
        let mut attempt = ClaimAttempt::submitting(Code::new("ABC123").unwrap());
        attempt.status = ClaimStatus::Confirmed;
        let view = ClaimView::project("ABC123", &attempt, connected(), &ContractConfig::default());
        assert_eq!(view.button_label, LABEL_CLAIMED);
        assert_eq!(
            view.notice.unwrap().message,
            "Successfully claimed 1 USDC!"
        );

        attempt.status = ClaimStatus::Failed;
        attempt.failure = Some(ClassifiedError::from(FailureCategory::CodeAlreadyClaimed));
        let view = ClaimView::project("ABC123", &attempt, connected(), &ContractConfig::default());
        assert!(!view.can_submit && !view.busy);
        let notice = view.notice.unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, "QR Code has already been claimed.");
    }
}
