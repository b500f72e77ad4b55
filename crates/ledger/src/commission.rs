//! Referral commission computation.
//!
//! Deciding who gets paid is separated from paying them: the engine walks
//! the referrer chain inside its snapshot, hands the resolved links to
//! [`compute_commissions`], and then applies the returned effects.

use rust_decimal::Decimal;
use serde::Serialize;
use taskripple_storage::AccountStatus;

/// One resolved ancestor in a referrer chain.
///
/// Index 0 of a chain is the direct referrer (level 1). A chain ends at the
/// first null or unresolvable referrer-id, so every link names a real
/// account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UplineLink {
    pub account_id: String,
    pub status: AccountStatus,
}

/// A commission the engine should pay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommissionEffect {
    pub account_id: String,
    /// Position in the chain, 1-indexed.
    pub level: u8,
    pub amount: Decimal,
}

/// Commissions owed for one activation.
///
/// Level `n` is the `n`th link of `chain` and pays `rates[n - 1]`. Only
/// active uplines are paid; an inactive one still consumes its level. At
/// most `min(max_levels, rates.len())` levels are considered.
pub fn compute_commissions(
    chain: &[UplineLink],
    rates: &[Decimal],
    max_levels: usize,
) -> Vec<CommissionEffect> {
    chain
        .iter()
        .zip(rates)
        .take(max_levels)
        .enumerate()
        .filter(|(_, (link, _))| link.status == AccountStatus::Active)
        .map(|(index, (link, rate))| CommissionEffect {
            account_id: link.account_id.clone(),
            level: (index + 1) as u8,
            amount: *rate,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_COMMISSION_LEVELS;
    use proptest::prelude::*;

    fn rates() -> Vec<Decimal> {
        [5, 4, 3, 2, 1].into_iter().map(Decimal::from).collect()
    }

    fn link(id: &str, status: AccountStatus) -> UplineLink {
        UplineLink {
            account_id: id.to_string(),
            status,
        }
    }

    fn active_chain(len: usize) -> Vec<UplineLink> {
        (1..=len)
            .map(|i| link(&format!("u{i}"), AccountStatus::Active))
            .collect()
    }

    #[test]
    fn full_active_chain_pays_every_level() {
        let effects = compute_commissions(&active_chain(5), &rates(), MAX_COMMISSION_LEVELS);
        let paid: Vec<(&str, u8, Decimal)> = effects
            .iter()
            .map(|e| (e.account_id.as_str(), e.level, e.amount))
            .collect();
        assert_eq!(
            paid,
            vec![
                ("u1", 1, Decimal::from(5)),
                ("u2", 2, Decimal::from(4)),
                ("u3", 3, Decimal::from(3)),
                ("u4", 4, Decimal::from(2)),
                ("u5", 5, Decimal::from(1)),
            ]
        );
    }

    #[test]
    fn sixth_ancestor_gets_nothing() {
        let effects = compute_commissions(&active_chain(7), &rates(), MAX_COMMISSION_LEVELS);
        assert_eq!(effects.len(), 5);
        assert!(effects.iter().all(|e| e.account_id != "u6" && e.account_id != "u7"));
    }

    #[test]
    fn inactive_upline_keeps_its_level() {
        let chain = vec![
            link("u1", AccountStatus::Active),
            link("u2", AccountStatus::Banned),
            link("u3", AccountStatus::Active),
        ];
        let effects = compute_commissions(&chain, &rates(), MAX_COMMISSION_LEVELS);
        assert_eq!(effects.len(), 2);
        assert_eq!(effects[1].account_id, "u3");
        assert_eq!(effects[1].level, 3);
        assert_eq!(effects[1].amount, Decimal::from(3));
    }

    #[test]
    fn pending_and_review_uplines_are_skipped() {
        let chain = vec![
            link("u1", AccountStatus::Pending),
            link("u2", AccountStatus::Review),
        ];
        assert!(compute_commissions(&chain, &rates(), MAX_COMMISSION_LEVELS).is_empty());
    }

    #[test]
    fn empty_chain_pays_nothing() {
        assert!(compute_commissions(&[], &rates(), MAX_COMMISSION_LEVELS).is_empty());
    }

    #[test]
    fn short_rate_table_limits_depth() {
        let effects = compute_commissions(&active_chain(5), &rates()[..2], MAX_COMMISSION_LEVELS);
        assert_eq!(effects.len(), 2);
    }

    fn status_strategy() -> impl Strategy<Value = AccountStatus> {
        prop_oneof![
            Just(AccountStatus::Pending),
            Just(AccountStatus::Review),
            Just(AccountStatus::Active),
            Just(AccountStatus::Banned),
        ]
    }

    proptest! {
        #[test]
        fn effects_are_bounded_and_positional(
            statuses in prop::collection::vec(status_strategy(), 0..12),
            max_levels in 0usize..8,
        ) {
            let chain: Vec<UplineLink> = statuses
                .iter()
                .enumerate()
                .map(|(i, s)| link(&format!("u{}", i + 1), *s))
                .collect();
            let rates = rates();
            let effects = compute_commissions(&chain, &rates, max_levels);

            let depth = chain.len().min(rates.len()).min(max_levels);
            prop_assert!(effects.len() <= depth);

            let expected_active = chain[..depth]
                .iter()
                .filter(|l| l.status == AccountStatus::Active)
                .count();
            prop_assert_eq!(effects.len(), expected_active);

            let mut last_level = 0u8;
            for effect in &effects {
                let index = usize::from(effect.level) - 1;
                prop_assert!(effect.level > last_level);
                prop_assert_eq!(&chain[index].account_id, &effect.account_id);
                prop_assert_eq!(chain[index].status, AccountStatus::Active);
                prop_assert_eq!(effect.amount, rates[index]);
                last_level = effect.level;
            }
        }

        #[test]
        fn total_never_exceeds_rate_sum(len in 0usize..10) {
            let rates = rates();
            let total: Decimal = compute_commissions(&active_chain(len), &rates, MAX_COMMISSION_LEVELS)
                .iter()
                .map(|e| e.amount)
                .sum();
            let cap: Decimal = rates.iter().sum();
            prop_assert!(total <= cap);
        }
    }
}
