pub mod solana;

pub use solana::{AnchoredLedger, SolanaAnchor};
