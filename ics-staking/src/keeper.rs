use ics_safe_math::Dec;
use tracing::{debug, info, warn};

use crate::aggregate;
use crate::allocation::{self, AllocationMap, AllocationPlan};
use crate::coin::Coin;
use crate::completion::{self, DelegatorRewards};
use crate::delegation::{self, Delegation};
use crate::error::{Result, StakingError};
use crate::intent::{DelegatorIntent, IntentVector};
use crate::store::{self, KvStore, KEY_PREFIX_ZONE};
use crate::traits::{AddressValidator, BalanceLookup, MessageSubmitter};
use crate::zone::Zone;

/// Owns the collaborators and exposes every stateful operation of the core.
///
/// The keeper is single-threaded: callers hand it a zone record, it reads
/// and writes through `S`, and nothing is cached between calls.
pub struct Keeper<S, B, V, M> {
    store: S,
    bank: B,
    address_validator: V,
    submitter: M,
}

/// Looks up `address`'s balance in `denom`, failing if the address does not
/// decode.
fn resolve_balance<B, V>(bank: &B, address_validator: &V, address: &str, denom: &str) -> Result<u128>
where
    B: BalanceLookup,
    V: AddressValidator,
{
    address_validator
        .validate(address)
        .map_err(|e| StakingError::BalanceLookup {
            address: address.to_string(),
            reason: e.to_string(),
        })?;
    bank.balance(address, denom)
}

impl<S, B, V, M> Keeper<S, B, V, M>
where
    S: KvStore,
    B: BalanceLookup,
    V: AddressValidator,
    M: MessageSubmitter,
{
    pub fn new(store: S, bank: B, address_validator: V, submitter: M) -> Self {
        Keeper {
            store,
            bank,
            address_validator,
            submitter,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn submitter(&self) -> &M {
        &self.submitter
    }

    // ---------------------------------------------------------------------
    // Zones
    // ---------------------------------------------------------------------

    pub fn get_zone(&self, chain_id: &str) -> Result<Option<Zone>> {
        self.store
            .get(&store::zone_key(chain_id)?)?
            .map(|bytes| store::decode(&bytes))
            .transpose()
    }

    /// Like [`get_zone`](Self::get_zone) but a missing zone is an error.
    pub fn zone(&self, chain_id: &str) -> Result<Zone> {
        self.get_zone(chain_id)?
            .ok_or_else(|| StakingError::ZoneNotFound(chain_id.to_string()))
    }

    pub fn set_zone(&mut self, zone: &Zone) -> Result<()> {
        self.store
            .set(&store::zone_key(&zone.chain_id)?, store::encode(zone)?)
    }

    pub fn all_zones(&self) -> Result<Vec<Zone>> {
        self.store
            .prefix_iter(&[KEY_PREFIX_ZONE])?
            .iter()
            .map(|(_, bytes)| store::decode(bytes))
            .collect()
    }

    // ---------------------------------------------------------------------
    // Intents
    // ---------------------------------------------------------------------

    pub fn get_intent(
        &self,
        zone: &Zone,
        delegator: &str,
        snapshot: bool,
    ) -> Result<Option<DelegatorIntent>> {
        self.store
            .get(&store::intent_key(&zone.chain_id, delegator, snapshot)?)?
            .map(|bytes| store::decode(&bytes))
            .transpose()
    }

    pub fn set_intent(&mut self, zone: &Zone, intent: &DelegatorIntent, snapshot: bool) -> Result<()> {
        self.store.set(
            &store::intent_key(&zone.chain_id, &intent.delegator, snapshot)?,
            store::encode(intent)?,
        )
    }

    pub fn delete_intent(&mut self, zone: &Zone, delegator: &str, snapshot: bool) -> Result<()> {
        self.store
            .delete(&store::intent_key(&zone.chain_id, delegator, snapshot)?)
    }

    /// Calls `f` with each stored intent of the zone and its position.
    /// Returning `true` from `f` stops the walk.
    pub fn iterate_intents<F>(&self, zone: &Zone, snapshot: bool, mut f: F) -> Result<()>
    where
        F: FnMut(usize, DelegatorIntent) -> bool,
    {
        let entries = self
            .store
            .prefix_iter(&store::intent_prefix(&zone.chain_id, snapshot)?)?;
        for (index, (_, bytes)) in entries.iter().enumerate() {
            if f(index, store::decode(bytes)?) {
                break;
            }
        }
        Ok(())
    }

    pub fn all_intents(&self, zone: &Zone, snapshot: bool) -> Result<Vec<DelegatorIntent>> {
        let mut intents = Vec::new();
        self.iterate_intents(zone, snapshot, |_, intent| {
            intents.push(intent);
            false
        })?;
        Ok(intents)
    }

    /// Every intent of the zone scaled by its delegator's `local_denom`
    /// balance. Fails without a partial result if any delegator cannot be
    /// resolved.
    pub fn all_ordinalized_intents(&self, zone: &Zone, snapshot: bool) -> Result<Vec<DelegatorIntent>> {
        let records = self.all_intents(zone, snapshot)?;
        aggregate::ordinalized_intents(records, |address| {
            resolve_balance(&self.bank, &self.address_validator, address, &zone.local_denom)
        })
    }

    /// Recomputes and persists the zone's aggregate intent from the live
    /// intent records.
    pub fn aggregate_intents(&mut self, zone: &mut Zone) -> Result<IntentVector> {
        let records = self.all_intents(zone, false)?;
        let denom = zone.local_denom.clone();
        let aggregate = {
            let bank = &self.bank;
            let address_validator = &self.address_validator;
            aggregate::aggregate_intents(zone, records, |address| {
                resolve_balance(bank, address_validator, address, &denom)
            })?
        };
        self.set_zone(zone)?;
        Ok(aggregate)
    }

    /// Folds a deposit into the sender's live intent.
    ///
    /// The sender's existing intent is weighted by its `base_denom` balance
    /// scaled by the zone's redemption rate; tokenized-share coins in
    /// `in_amount` supply the incoming weights. Returns the stored record, or
    /// `None` if the merged intent is empty and nothing was written.
    pub fn update_intent(
        &mut self,
        sender: &str,
        zone: &Zone,
        in_amount: &[Coin],
    ) -> Result<Option<DelegatorIntent>> {
        self.address_validator.validate(sender)?;

        let intent = self
            .get_intent(zone, sender, false)?
            .unwrap_or_else(|| DelegatorIntent::empty(sender));

        let balance = self.bank.balance(sender, &zone.base_denom)?;
        let base_balance = zone.redemption_rate.mul_truncate(Dec::from_u128(balance))?;

        let incoming = IntentVector::from_lsm_coins(in_amount, |valoper| zone.is_validator(valoper))?;
        let intent = intent.add_ordinal(base_balance, &incoming)?;

        if intent.intents.is_empty() {
            debug!(chain_id = %zone.chain_id, sender, "no intent to record");
            return Ok(None);
        }

        self.set_intent(zone, &intent, false)?;
        info!(
            chain_id = %zone.chain_id,
            sender,
            validators = intent.intents.len(),
            "updated intent"
        );
        Ok(Some(intent))
    }

    /// Replaces `delegator`'s live intent with the wire-format `intents`
    /// (e.g. `"0.3valoperA,0.7valoperB"`).
    ///
    /// Every named validator must belong to the zone and the weights must
    /// sum to exactly one.
    pub fn signal_intent(
        &mut self,
        zone: &Zone,
        delegator: &str,
        intents: &str,
    ) -> Result<DelegatorIntent> {
        self.address_validator.validate(delegator)?;

        let vector: IntentVector = intents.parse()?;
        if let Some(unknown) = vector.validators().find(|v| !zone.is_validator(v)) {
            return Err(StakingError::InvalidIntent(format!(
                "{unknown} is not a validator of {}",
                zone.chain_id
            )));
        }
        let sum = vector.weight_sum()?;
        if sum != Dec::ONE {
            return Err(StakingError::InvalidIntent(format!(
                "weights sum to {sum}, expected 1"
            )));
        }

        let intent = DelegatorIntent {
            delegator: delegator.to_string(),
            intents: vector,
        };
        self.set_intent(zone, &intent, false)?;
        info!(chain_id = %zone.chain_id, delegator, "signalled intent");
        Ok(intent)
    }

    /// Replaces the zone's snapshot intents with a copy of the live ones.
    /// Returns the number of records copied.
    pub fn snapshot_intents(&mut self, zone: &Zone) -> Result<usize> {
        for stale in self.all_intents(zone, true)? {
            self.delete_intent(zone, &stale.delegator, true)?;
        }
        let live = self.all_intents(zone, false)?;
        for intent in &live {
            self.set_intent(zone, intent, true)?;
        }
        info!(chain_id = %zone.chain_id, records = live.len(), "snapshotted intents");
        Ok(live.len())
    }

    // ---------------------------------------------------------------------
    // Delegations
    // ---------------------------------------------------------------------

    pub fn get_delegation(
        &self,
        zone: &Zone,
        delegator: &str,
        validator: &str,
    ) -> Result<Option<Delegation>> {
        self.store
            .get(&store::delegation_key(&zone.chain_id, delegator, validator)?)?
            .map(|bytes| store::decode(&bytes))
            .transpose()
    }

    pub fn set_delegation(&mut self, zone: &Zone, delegation: &Delegation) -> Result<()> {
        self.store.set(
            &store::delegation_key(
                &zone.chain_id,
                &delegation.delegation_address,
                &delegation.validator_address,
            )?,
            store::encode(delegation)?,
        )
    }

    pub fn remove_delegation(&mut self, zone: &Zone, delegation: &Delegation) -> Result<()> {
        self.store.delete(&store::delegation_key(
            &zone.chain_id,
            &delegation.delegation_address,
            &delegation.validator_address,
        )?)
    }

    /// Calls `f` with every delegation of the zone; returning `true` stops
    /// the walk.
    pub fn iterate_all_delegations<F>(&self, zone: &Zone, mut f: F) -> Result<()>
    where
        F: FnMut(Delegation) -> bool,
    {
        for (_, bytes) in self
            .store
            .prefix_iter(&store::delegations_prefix(&zone.chain_id)?)?
        {
            if f(store::decode(&bytes)?) {
                break;
            }
        }
        Ok(())
    }

    pub fn all_delegations(&self, zone: &Zone) -> Result<Vec<Delegation>> {
        let mut delegations = Vec::new();
        self.iterate_all_delegations(zone, |delegation| {
            delegations.push(delegation);
            false
        })?;
        Ok(delegations)
    }

    pub fn validator_delegations(&self, zone: &Zone, validator: &str) -> Result<Vec<Delegation>> {
        let mut delegations = Vec::new();
        self.iterate_all_delegations(zone, |delegation| {
            if delegation.validator_address == validator {
                delegations.push(delegation);
            }
            false
        })?;
        Ok(delegations)
    }

    pub fn delegator_delegations(&self, zone: &Zone, delegator: &str) -> Result<Vec<Delegation>> {
        self.store
            .prefix_iter(&store::delegator_delegations_prefix(&zone.chain_id, delegator)?)?
            .iter()
            .map(|(_, bytes)| store::decode(bytes))
            .collect()
    }

    /// Current holding per validator and the zone-wide total.
    pub fn delegation_map(&self, zone: &Zone) -> Result<(AllocationMap, u128)> {
        delegation::delegation_map(&self.all_delegations(zone)?)
    }

    /// Plans how a deposit of `amount` is spread over the zone's validators,
    /// steering toward the aggregate intent (or an equal split if none).
    pub fn determine_plan_for_delegation(&self, zone: &Zone, amount: &Coin) -> Result<AllocationPlan> {
        if amount.denom != zone.base_denom {
            return Err(StakingError::DenomMismatch {
                expected: zone.base_denom.clone(),
                actual: amount.denom.clone(),
            });
        }
        let (current, current_sum) = self.delegation_map(zone)?;
        let target = zone.aggregate_intent_or_default()?;
        let plan = allocation::plan_allocation(&current, current_sum, &target, amount.amount)?;
        debug!(
            chain_id = %zone.chain_id,
            amount = amount.amount,
            current_sum,
            validators = plan.len(),
            "planned delegation"
        );
        Ok(plan)
    }

    // ---------------------------------------------------------------------
    // Reward withdrawal batches
    // ---------------------------------------------------------------------

    /// Issues one reward withdrawal per delegation of `delegator` that has
    /// accrued anything, and registers the batch on the zone. Returns the
    /// operations now outstanding.
    ///
    /// The batch is only counted once it has been submitted, so a failed
    /// submission leaves both `zone` and the stored record unchanged. The zone
    /// is persisted even when nothing qualifies.
    pub fn withdraw_delegation_rewards_for_response(
        &mut self,
        zone: &mut Zone,
        delegator: &str,
        rewards: &DelegatorRewards,
    ) -> Result<u32> {
        let delegations = self.delegator_delegations(zone, delegator)?;
        let msgs = completion::withdrawal_messages(&delegations, rewards);

        // Counted on a copy first so a full counter fails before anything is sent.
        let mut updated = zone.clone();
        let pending = completion::dispatch_batch(&mut updated, &msgs)?;

        if !msgs.is_empty() {
            info!(
                chain_id = %zone.chain_id,
                delegator,
                pending,
                "submitting reward withdrawals"
            );
            if let Err(err) = self
                .submitter
                .submit_tx(msgs, &zone.delegation_address, "")
            {
                warn!(chain_id = %zone.chain_id, delegator, "{err}");
                return Err(err);
            }
        }

        *zone = updated;
        self.set_zone(zone)?;
        Ok(pending)
    }

    /// Handles one withdrawal acknowledgement for the zone and persists the
    /// updated counter. Returns the operations still outstanding.
    pub fn handle_withdraw_rewards(&mut self, zone: &mut Zone) -> Result<u32> {
        let pending = match completion::acknowledge(zone) {
            Ok(pending) => pending,
            Err(err) => {
                warn!(chain_id = %zone.chain_id, "{err}");
                return Err(err);
            }
        };
        self.set_zone(zone)?;
        Ok(pending)
    }
}
