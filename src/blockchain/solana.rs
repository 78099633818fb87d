// src/blockchain/solana.rs
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use solana_client::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::Transaction,
};
use tracing::{error, info};

use crate::core::binding::CredentialLedger;
use crate::core::identity::types::CredentialBinding;
use crate::storage::bindings::BindingStore;
use crate::utils::error::{Result, IdentityError};

const MEMO_PROGRAM_ID: &str = "MemoSq4gqABAXKb96qnH8TYSrQ86P1xzQ6S3xpC6PZ3";

/// Writes `wallet:hash` memo transactions so each accepted binding leaves a
/// public, timestamped trace on chain.
pub struct SolanaAnchor {
    rpc_client: Arc<RpcClient>,
    keypair: Arc<Keypair>,
    memo_program: Pubkey,
}

impl SolanaAnchor {
    pub fn new(rpc_url: &str, keypair: Keypair) -> Result<Self> {
        let rpc_client = Arc::new(RpcClient::new_with_commitment(
            rpc_url.to_string(),
            CommitmentConfig::confirmed(),
        ));
        let memo_program = Pubkey::from_str(MEMO_PROGRAM_ID)
            .map_err(|e| IdentityError::Config(format!("invalid memo program id: {}", e)))?;

        Ok(Self {
            rpc_client,
            keypair: Arc::new(keypair),
            memo_program,
        })
    }

    pub async fn anchor_binding(&self, wallet_address: &str, biometric_hash: &str) -> Result<String> {
        let memo = memo_line(wallet_address, biometric_hash);
        let client = self.rpc_client.clone();
        let keypair = self.keypair.clone();
        let memo_program = self.memo_program;

        let signature = tokio::task::spawn_blocking(move || -> Result<String> {
            let blockhash = client.get_latest_blockhash().map_err(|e| {
                error!("Failed to fetch recent blockhash: {}", e);
                IdentityError::LedgerUnavailable(e.to_string())
            })?;

            let instruction = Instruction::new_with_bytes(memo_program, memo.as_bytes(), vec![]);
            let transaction = Transaction::new_signed_with_payer(
                &[instruction],
                Some(&keypair.pubkey()),
                &[keypair.as_ref()],
                blockhash,
            );

            let signature = client.send_and_confirm_transaction(&transaction).map_err(|e| {
                error!("Failed to send anchor transaction: {}", e);
                IdentityError::LedgerUnavailable(e.to_string())
            })?;

            Ok(signature.to_string())
        })
        .await
        .map_err(|e| IdentityError::LedgerUnavailable(e.to_string()))??;

        info!(wallet = wallet_address, signature = %signature, "Binding anchored on chain");
        Ok(signature)
    }
}

fn memo_line(wallet_address: &str, biometric_hash: &str) -> String {
    format!("biobind:{}:{}", wallet_address.to_lowercase(), biometric_hash)
}

/// Ledger that anchors every accepted binding on chain before recording it in
/// the local index. Reads are served from the index; a failed anchor leaves
/// the index untouched so the two views cannot diverge.
pub struct AnchoredLedger {
    index: BindingStore,
    anchor: SolanaAnchor,
}

impl AnchoredLedger {
    pub fn new(index: BindingStore, anchor: SolanaAnchor) -> Self {
        Self { index, anchor }
    }
}

#[async_trait]
impl CredentialLedger for AnchoredLedger {
    async fn register_binding(&self, binding: CredentialBinding) -> Result<()> {
        self.anchor
            .anchor_binding(&binding.wallet_address, &binding.biometric_hash)
            .await?;
        self.index.register_binding(binding).await
    }

    async fn binding_for(&self, wallet_address: &str) -> Result<Option<CredentialBinding>> {
        self.index.binding_for(wallet_address).await
    }
}
