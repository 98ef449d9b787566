//! Transaction assembly.

use anyhow::Result;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::transaction::Transaction;

/// Ordered instruction list that can be signed against any blockhash.
///
/// Instructions appended after a first signing (e.g. a compute-unit price
/// derived from that signed transaction) require building again.
#[derive(Debug, Clone, Default)]
pub struct TransactionDraft {
    instructions: Vec<Instruction>,
}

impl TransactionDraft {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    /// Append an instruction at the end.
    pub fn with_instruction(mut self, instruction: Instruction) -> Self {
        self.instructions.push(instruction);
        self
    }

    /// Compile with `payer` as fee payer and sign with every signer.
    pub fn build_signed(
        &self,
        payer: &Pubkey,
        signers: &[&Keypair],
        recent_blockhash: Hash,
    ) -> Result<Transaction> {
        let mut transaction = Transaction::new_with_payer(&self.instructions, Some(payer));
        transaction.try_sign(signers, recent_blockhash)?;
        Ok(transaction)
    }
}
