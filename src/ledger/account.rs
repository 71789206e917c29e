/// Balance primitives on a ledger account
///
/// These only touch the in-memory value. Persisting the new balance and
/// enforcing business rules is the transaction engine's job.
use crate::db::models::Account;
use crate::error::{BankError, BankResult};
use rust_decimal::Decimal;

impl Account {
    /// Add `amount` to the balance
    pub fn credit(&mut self, amount: Decimal) -> BankResult<()> {
        ensure_positive(amount)?;
        self.balance = self.balance.checked_add(amount).ok_or_else(|| {
            BankError::Validation(format!("Crediting {} overflows account {}", amount, self.id))
        })?;
        Ok(())
    }

    /// Subtract `amount` from the balance
    ///
    /// Does not refuse to go negative; callers check [`Account::can_cover`] first.
    pub fn debit(&mut self, amount: Decimal) -> BankResult<()> {
        ensure_positive(amount)?;
        self.balance = self.balance.checked_sub(amount).ok_or_else(|| {
            BankError::Validation(format!("Debiting {} overflows account {}", amount, self.id))
        })?;
        Ok(())
    }

    pub fn is_restricted(&self) -> bool {
        self.flag
    }

    pub fn can_cover(&self, amount: Decimal) -> bool {
        self.balance >= amount
    }
}

pub(crate) fn ensure_positive(amount: Decimal) -> BankResult<()> {
    if amount <= Decimal::ZERO {
        return Err(BankError::InvalidAmount(amount));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn account(balance: Decimal) -> Account {
        Account {
            id: 20000000001,
            customer_id: None,
            account_type: "savings".to_string(),
            balance,
            transaction_key: 1234,
            flag: false,
            closed: false,
            created_at: Utc::now(),
        }
    }

    #[rstest]
    #[case(dec!(0), dec!(0.01))]
    #[case(dec!(100.00), dec!(60.00))]
    #[case(dec!(10.10), dec!(0.20))]
    #[case(dec!(0.1), dec!(0.2))]
    fn test_credit_then_debit_is_identity(#[case] start: Decimal, #[case] amount: Decimal) {
        let mut acc = account(start);
        acc.credit(amount).unwrap();
        acc.debit(amount).unwrap();
        assert_eq!(acc.balance, start);
    }

    #[rstest]
    #[case(dec!(0))]
    #[case(dec!(-5.00))]
    fn test_non_positive_amounts_rejected(#[case] amount: Decimal) {
        let mut acc = account(dec!(10.00));

        assert!(matches!(acc.credit(amount), Err(BankError::InvalidAmount(_))));
        assert!(matches!(acc.debit(amount), Err(BankError::InvalidAmount(_))));
        assert_eq!(acc.balance, dec!(10.00));
    }

    #[test]
    fn test_credit_overflow_is_reported() {
        let mut acc = account(Decimal::MAX);
        assert!(matches!(acc.credit(dec!(1)), Err(BankError::Validation(_))));
        assert_eq!(acc.balance, Decimal::MAX);
    }

    #[test]
    fn test_can_cover_and_restriction() {
        let mut acc = account(dec!(40.00));
        assert!(acc.can_cover(dec!(40.00)));
        assert!(!acc.can_cover(dec!(50.00)));

        assert!(!acc.is_restricted());
        acc.flag = true;
        assert!(acc.is_restricted());
    }
}
