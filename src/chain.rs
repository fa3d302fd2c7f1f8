//! Token issuing collaborator.
//!
//! Minting and transferring participation tokens happens on a chain this
//! service never talks to. The trait fixes the call contract; `DemoIssuer`
//! fabricates addresses and signatures that look like base58 but are not
//! valid on any network.

use async_trait::async_trait;
use rand::{distributions::Alphanumeric, Rng};

const BASE58_ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
const SIGNATURE_LEN: usize = 88;

/// Issuer errors.
#[derive(Debug)]
pub enum IssuerError {
    /// The collaborator refused or failed the call
    Rejected(String),
}

impl std::fmt::Display for IssuerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssuerError::Rejected(msg) => write!(f, "Token issuer rejected the call: {}", msg),
        }
    }
}

impl std::error::Error for IssuerError {}

/// Outcome of minting an event's token.
#[derive(Clone, Debug)]
pub struct MintReceipt {
    pub mint_address: String,
    pub signature: String,
}

#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Create the token an event hands out to attendees.
    async fn mint_event_token(&self, event_name: &str) -> Result<MintReceipt, IssuerError>;

    /// Transfer one token of `mint_address` to `recipient`, returning the
    /// transaction signature.
    async fn transfer_token(
        &self,
        mint_address: &str,
        recipient: &str,
    ) -> Result<String, IssuerError>;
}

/// Issuer that never leaves the process.
#[derive(Clone, Debug, Default)]
pub struct DemoIssuer;

impl DemoIssuer {
    fn base58(len: usize) -> String {
        let mut rng = rand::thread_rng();
        (0..len)
            .map(|_| BASE58_ALPHABET[rng.gen_range(0..BASE58_ALPHABET.len())] as char)
            .collect()
    }
}

#[async_trait]
impl TokenIssuer for DemoIssuer {
    async fn mint_event_token(&self, event_name: &str) -> Result<MintReceipt, IssuerError> {
        log::debug!("Demo mint for event {:?}", event_name);
        Ok(MintReceipt {
            mint_address: format!("sol{}", Self::base58(41)),
            signature: Self::base58(SIGNATURE_LEN),
        })
    }

    async fn transfer_token(
        &self,
        mint_address: &str,
        recipient: &str,
    ) -> Result<String, IssuerError> {
        log::debug!("Demo transfer of {} to {}", mint_address, recipient);
        Ok(Self::base58(SIGNATURE_LEN))
    }
}

/// QR payload handed to attendees: `pop-` followed by 8 lowercase
/// alphanumerics.
pub fn qr_code_payload() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect();
    format!("pop-{}", suffix)
}
