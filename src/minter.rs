/// Random identifier minting
///
/// Identifiers are drawn at random and made unique by the primary key of the
/// table they are inserted into. Callers iterate over a bounded run of
/// candidates, attempt the insert, and move on to the next candidate when
/// [`crate::db::is_id_collision`] reports the id was taken.
use crate::error::BankError;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::{Arc, Mutex};

/// Identifier spaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdSpace {
    /// 11-digit account numbers
    AccountNumber,
    /// 6-digit one-time codes
    Otp,
    /// 128 random bits rendered as 32 lowercase hex characters
    Hex128,
}

impl IdSpace {
    pub const ACCOUNT_NUMBER_RANGE: Range<i64> = 20_000_000_000..30_000_000_000;
    pub const OTP_RANGE: Range<i64> = 100_000..1_000_000;
}

#[derive(Clone)]
enum Source {
    Thread,
    Seeded(Arc<Mutex<StdRng>>),
}

/// Draws candidate identifiers, giving up after `max_attempts` per operation
#[derive(Clone)]
pub struct IdentifierMinter {
    max_attempts: u32,
    source: Source,
}

impl IdentifierMinter {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            source: Source::Thread,
        }
    }

    /// Deterministic minter, for reproducing collisions in tests
    pub fn seeded(max_attempts: u32, seed: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            source: Source::Seeded(Arc::new(Mutex::new(StdRng::seed_from_u64(seed)))),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut dyn RngCore) -> T) -> T {
        match &self.source {
            Source::Thread => f(&mut rand::thread_rng()),
            Source::Seeded(rng) => {
                let mut guard = rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                f(&mut *guard)
            }
        }
    }

    pub fn draw_account_number(&self) -> i64 {
        self.with_rng(|rng| rng.gen_range(IdSpace::ACCOUNT_NUMBER_RANGE))
    }

    pub fn draw_otp(&self) -> i64 {
        self.with_rng(|rng| rng.gen_range(IdSpace::OTP_RANGE))
    }

    pub fn draw_hex(&self) -> String {
        let mut bytes = [0u8; 16];
        self.with_rng(|rng| rng.fill_bytes(&mut bytes));
        hex::encode(bytes)
    }

    /// Bounded run of account number candidates
    pub fn account_numbers(&self) -> impl Iterator<Item = i64> + '_ {
        (0..self.max_attempts).map(move |_| self.draw_account_number())
    }

    /// Bounded run of OTP candidates
    pub fn otps(&self) -> impl Iterator<Item = i64> + '_ {
        (0..self.max_attempts).map(move |_| self.draw_otp())
    }

    /// Bounded run of hex id candidates
    pub fn hex_ids(&self) -> impl Iterator<Item = String> + '_ {
        (0..self.max_attempts).map(move |_| self.draw_hex())
    }

    /// Error reported once every candidate for `space` collided
    pub fn exhausted(&self, space: IdSpace) -> BankError {
        tracing::warn!(
            "Gave up minting {:?} identifier after {} attempts",
            space,
            self.max_attempts
        );
        BankError::IdentifierSpaceExhausted(space)
    }
}

impl std::fmt::Debug for IdentifierMinter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentifierMinter")
            .field("max_attempts", &self.max_attempts)
            .field("seeded", &matches!(self.source, Source::Seeded(_)))
            .finish()
    }
}
