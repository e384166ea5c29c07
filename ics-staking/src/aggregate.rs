//! Reduces every depositor's intent for a zone into one normalized target.
//!
//! Each depositor's normalized vector is ordinalized by that depositor's
//! current balance, summed per validator, and the running map is finally
//! divided by the grand total. The pass is recomputed from scratch each time
//! and any failure aborts it before the zone is touched, so a partial
//! aggregate is never committed.

use ics_safe_math::Dec;
use tracing::{debug, info};

use crate::error::{Result, StakingError};
use crate::intent::{DelegatorIntent, IntentVector};
use crate::zone::Zone;

/// Every record ordinalized by its delegator's balance.
///
/// `balance_of` is called once per record; the first failure is returned and
/// no partial list is produced.
pub fn ordinalized_intents<I, F>(records: I, mut balance_of: F) -> Result<Vec<DelegatorIntent>>
where
    I: IntoIterator<Item = DelegatorIntent>,
    F: FnMut(&str) -> Result<u128>,
{
    records
        .into_iter()
        .map(|record| {
            let balance = Dec::from_u128(balance_of(&record.delegator)?);
            record.ordinalize(balance)
        })
        .collect()
}

/// Recomputes `zone.aggregate_intent` from `records`.
///
/// # Errors
/// * whatever `balance_of` returns for an unresolvable delegator;
/// * [`StakingError::DegenerateAggregate`] if at least one validator was
///   named but the balance-weighted total is zero;
/// * [`StakingError::Math`] on overflow.
///
/// On error `zone` is left unchanged.
pub fn aggregate_intents<I, F>(zone: &mut Zone, records: I, mut balance_of: F) -> Result<IntentVector>
where
    I: IntoIterator<Item = DelegatorIntent>,
    F: FnMut(&str) -> Result<u128>,
{
    let mut running = IntentVector::new();
    let mut total = Dec::ZERO;
    let mut depositors = 0usize;

    for record in records {
        let balance = Dec::from_u128(balance_of(&record.delegator)?);
        let ordinalized = record.intents.ordinalize(balance)?;

        for intent in ordinalized.iter() {
            total = total.checked_add(intent.weight)?;
            running.accumulate(&intent.valoper_address, intent.weight)?;
        }
        depositors += 1;
    }

    if !running.is_empty() && total.is_zero() {
        return Err(StakingError::DegenerateAggregate {
            chain_id: zone.chain_id.clone(),
        });
    }

    debug!(chain_id = %zone.chain_id, %total, "ordinalized intent sum");
    let aggregate = running.normalize_by(total)?;

    info!(
        chain_id = %zone.chain_id,
        depositors,
        validators = aggregate.len(),
        "aggregated intents"
    );
    zone.aggregate_intent = aggregate.clone();
    Ok(aggregate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::ValidatorIntent;
    use std::collections::BTreeMap;

    fn dec(s: &str) -> Dec {
        s.parse().unwrap()
    }

    fn record(delegator: &str, entries: &[(&str, &str)]) -> DelegatorIntent {
        let mut intents = IntentVector::new();
        for (valoper, weight) in entries {
            intents.insert(ValidatorIntent::new(*valoper, dec(weight)).unwrap());
        }
        DelegatorIntent {
            delegator: delegator.into(),
            intents,
        }
    }

    fn balances(entries: &[(&str, u128)]) -> impl FnMut(&str) -> Result<u128> {
        let map: BTreeMap<String, u128> = entries
            .iter()
            .map(|(addr, amount)| (addr.to_string(), *amount))
            .collect();
        move |addr: &str| {
            map.get(addr)
                .copied()
                .ok_or_else(|| StakingError::BalanceLookup {
                    address: addr.into(),
                    reason: "unknown account".into(),
                })
        }
    }

    #[test]
    fn test_balance_weighted_aggregate() {
        let mut zone = Zone::new("hub-4", "uqatom", "uatom");
        let records = vec![
            record("alice", &[("val1", "0.5"), ("val2", "0.5")]),
            record("bob", &[("val2", "1")]),
        ];

        let aggregate =
            aggregate_intents(&mut zone, records, balances(&[("alice", 100), ("bob", 300)]))
                .unwrap();

        // val1: 50, val2: 50 + 300, total 400
        assert_eq!(aggregate.get("val1").unwrap().weight, dec("0.125"));
        assert_eq!(aggregate.get("val2").unwrap().weight, dec("0.875"));
        assert_eq!(zone.aggregate_intent, aggregate);
    }

    #[test]
    fn test_replaces_previous_aggregate() {
        let mut zone = Zone::new("hub-4", "uqatom", "uatom");
        zone.aggregate_intent
            .insert(ValidatorIntent::new("stale", Dec::ONE).unwrap());

        aggregate_intents(
            &mut zone,
            vec![record("alice", &[("val1", "1")])],
            balances(&[("alice", 10)]),
        )
        .unwrap();

        assert!(!zone.aggregate_intent.contains("stale"));
        assert_eq!(zone.aggregate_intent.get("val1").unwrap().weight, Dec::ONE);
    }

    #[test]
    fn test_lookup_failure_leaves_zone_untouched() {
        let mut zone = Zone::new("hub-4", "uqatom", "uatom");
        zone.aggregate_intent
            .insert(ValidatorIntent::new("val9", Dec::ONE).unwrap());
        let before = zone.clone();

        let result = aggregate_intents(
            &mut zone,
            vec![
                record("alice", &[("val1", "1")]),
                record("mallory", &[("val2", "1")]),
            ],
            balances(&[("alice", 10)]),
        );

        assert!(matches!(result, Err(StakingError::BalanceLookup { .. })));
        assert_eq!(zone, before);
    }

    #[test]
    fn test_empty_running_map_is_not_degenerate() {
        let mut zone = Zone::new("hub-4", "uqatom", "uatom");
        let aggregate = aggregate_intents(
            &mut zone,
            vec![record("alice", &[])],
            balances(&[("alice", 0)]),
        )
        .unwrap();
        assert!(aggregate.is_empty());
    }

    #[test]
    fn test_zero_total_is_degenerate() {
        let mut zone = Zone::new("hub-4", "uqatom", "uatom");
        let result = aggregate_intents(
            &mut zone,
            vec![record("alice", &[("val1", "0"), ("val2", "0")])],
            balances(&[("alice", 1_000)]),
        );
        assert_eq!(
            result,
            Err(StakingError::DegenerateAggregate {
                chain_id: "hub-4".into()
            })
        );

        // Zero balance against a non-empty intent reduces to the same thing.
        let result = aggregate_intents(
            &mut zone,
            vec![record("bob", &[("val1", "1")])],
            balances(&[("bob", 0)]),
        );
        assert!(matches!(result, Err(StakingError::DegenerateAggregate { .. })));
    }

    #[test]
    fn test_ordinalized_intents_all_or_nothing() {
        let records = vec![
            record("alice", &[("val1", "0.25"), ("val2", "0.75")]),
            record("bob", &[("val1", "1")]),
        ];
        let ordinalized =
            ordinalized_intents(records.clone(), balances(&[("alice", 400), ("bob", 10)]))
                .unwrap();
        assert_eq!(ordinalized[0].intents.get("val1").unwrap().weight, dec("100"));
        assert_eq!(ordinalized[0].intents.get("val2").unwrap().weight, dec("300"));
        assert_eq!(ordinalized[1].intents.get("val1").unwrap().weight, dec("10"));

        assert!(ordinalized_intents(records, balances(&[("alice", 400)])).is_err());
    }
}
