//! Composition root: one store, one clock, and accessors for each component.

use chrono::{DateTime, NaiveDate, Utc};

use crate::{
  clock::{Clock, SystemClock},
  entitlement::Entitlements,
  gate::AccessGate,
  goals::Goals,
  ledger::HabitLedger,
  principles::Principles,
  progress::Progress,
  store::RecordStore,
  tasks::Tasks,
};

#[derive(Debug, Clone)]
pub struct Mindjoy<S, C = SystemClock> {
  store: S,
  clock: C,
}

impl<S> Mindjoy<S> {
  pub fn new(store: S) -> Self { Self { store, clock: SystemClock } }
}

impl<S, C: Clock> Mindjoy<S, C> {
  pub fn with_clock(store: S, clock: C) -> Self { Self { store, clock } }

  pub fn store(&self) -> &S { &self.store }

  pub fn clock(&self) -> &C { &self.clock }

  pub fn now(&self) -> DateTime<Utc> { self.clock.now() }

  pub fn today(&self) -> NaiveDate { self.clock.today() }
}

impl<S: RecordStore, C: Clock> Mindjoy<S, C> {
  pub fn tasks(&self) -> Tasks<'_, S> { Tasks::new(&self.store) }

  pub fn goals(&self) -> Goals<'_, S> { Goals::new(&self.store) }

  pub fn principles(&self) -> Principles<'_, S> { Principles::new(&self.store) }

  pub fn entitlements(&self) -> Entitlements<'_, S> { Entitlements::new(&self.store) }

  pub fn habits(&self) -> HabitLedger<'_, S> { HabitLedger::new(&self.store) }

  pub fn gate(&self) -> AccessGate<'_, S> { AccessGate::new(&self.store) }

  pub fn progress(&self) -> Progress<'_, S> { Progress::new(&self.store) }
}
