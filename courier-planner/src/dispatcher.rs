//! Single-writer front door over a ledger and a planner.

use courier_core::{
    Geocoder, Ledger, LedgerError, Order, OrderId, OrderStatus, RejectionReason, SlotName,
    TravelTimeEstimator,
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::{DispatchError, PlanError};
use crate::planner::{CycleReport, GreedyPlanner};

#[derive(Debug)]
struct DispatchState {
    ledger: Ledger,
    generation: CancellationToken,
}

impl DispatchState {
    /// Cancel any cycle planned against the current ledger contents.
    fn invalidate(&mut self) {
        self.generation.cancel();
        self.generation = CancellationToken::new();
    }
}

/// Serialises ledger mutations and planning cycles.
///
/// Every mutation that changes the ledger cancels the cycle in flight, which
/// then fails with [`PlanError::Cancelled`] instead of returning a stale
/// assignment. Cycles themselves run one at a time.
#[derive(Debug)]
pub struct Dispatcher<G, T> {
    planner: GreedyPlanner<G, T>,
    state: Mutex<DispatchState>,
    cycle: Mutex<()>,
}

impl<G, T> Dispatcher<G, T>
where
    G: Geocoder,
    T: TravelTimeEstimator,
{
    /// Create a dispatcher with an empty ledger sized by the planner's depot.
    #[must_use]
    pub fn new(planner: GreedyPlanner<G, T>) -> Self {
        let ledger = Ledger::new(planner.depot().layout);
        Self {
            planner,
            state: Mutex::new(DispatchState {
                ledger,
                generation: CancellationToken::new(),
            }),
            cycle: Mutex::new(()),
        }
    }

    /// The planner driving cycles.
    #[must_use]
    pub const fn planner(&self) -> &GreedyPlanner<G, T> {
        &self.planner
    }

    /// Submit a new order, geocoding it eagerly.
    ///
    /// A transient geocoding failure does not block submission; the address
    /// is resolved again during the next cycle.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Unresolvable`] when the geocoder has no match and
    /// [`DispatchError::Ledger`] for a blank address.
    pub async fn submit(&self, address: &str) -> Result<Order, DispatchError> {
        let trimmed = address.trim();
        if trimmed.is_empty() {
            return Err(LedgerError::EmptyAddress.into());
        }
        let coordinate = match self.planner.resolve_address(trimmed).await {
            Ok(coordinate) => Some(coordinate),
            Err(source) if source.is_permanent() => {
                return Err(DispatchError::Unresolvable {
                    address: trimmed.to_owned(),
                    source,
                });
            }
            Err(err) => {
                log::warn!("accepting {trimmed:?} unresolved: {err}");
                None
            }
        };

        let mut state = self.state.lock().await;
        let order = match coordinate {
            Some(found) => state.ledger.submit_resolved(trimmed, found)?,
            None => state.ledger.submit(trimmed)?,
        };
        state.invalidate();
        log::debug!("submitted order {} for {trimmed:?}", order.id);
        Ok(order)
    }

    /// Run one planning cycle over the current pending orders.
    ///
    /// Rejections and newly resolved coordinates are written back to the
    /// ledger before the report is returned.
    ///
    /// # Errors
    ///
    /// [`PlanError::Cancelled`] when the ledger changed during the cycle and
    /// [`PlanError::WarehouseUnresolvable`] when the depot does not geocode.
    pub async fn run_cycle(&self) -> Result<CycleReport, DispatchError> {
        let _running = self.cycle.lock().await;
        let (pending, token) = {
            let state = self.state.lock().await;
            (state.ledger.pending(), state.generation.clone())
        };

        let cycle = self.planner.prepare(pending, &token).await?;

        let mut state = self.state.lock().await;
        if token.is_cancelled() {
            return Err(PlanError::Cancelled.into());
        }
        let report = self.planner.commit(cycle);
        for (id, coordinate) in &report.resolved {
            state.ledger.record_coordinate(*id, *coordinate);
        }
        for rejected in &report.rejected {
            if let Err(err) = state.ledger.reject(rejected.id, rejected.reason) {
                log::warn!("could not reject order {}: {err}", rejected.id);
            }
        }
        Ok(report)
    }

    /// Cancel the cycle in flight, if any, without touching the ledger.
    pub async fn cancel_cycle(&self) {
        self.state.lock().await.invalidate();
    }

    /// Mark orders delivered by `slot`. See [`Ledger::mark_delivered`].
    ///
    /// # Errors
    ///
    /// Propagates the ledger's validation error; nothing changes on error.
    pub async fn mark_delivered(
        &self,
        slot: &SlotName,
        ids: &[OrderId],
    ) -> Result<usize, DispatchError> {
        let mut state = self.state.lock().await;
        let marked = state.ledger.mark_delivered(slot, ids)?;
        if marked > 0 {
            state.invalidate();
        }
        Ok(marked)
    }

    /// Remove orders from the working set. See [`Ledger::clear`].
    pub async fn clear(&self, ids: &[OrderId]) -> usize {
        let mut state = self.state.lock().await;
        let removed = state.ledger.clear(ids);
        if removed > 0 {
            state.invalidate();
        }
        removed
    }

    /// A slot reports its run finished: mark `ids` delivered by `slot`, then
    /// clear them from the working set. Returns the number cleared.
    ///
    /// # Errors
    ///
    /// Propagates the ledger's validation error; nothing changes on error.
    pub async fn complete_slot(
        &self,
        slot: &SlotName,
        ids: &[OrderId],
    ) -> Result<usize, DispatchError> {
        let mut state = self.state.lock().await;
        state.ledger.mark_delivered(slot, ids)?;
        let removed = state.ledger.clear(ids);
        state.invalidate();
        log::debug!("{slot} completed; {removed} orders cleared");
        Ok(removed)
    }

    /// Orders awaiting assignment, in submission order.
    pub async fn pending(&self) -> Vec<Order> {
        self.state.lock().await.ledger.pending()
    }

    /// Lifecycle state of `id`.
    pub async fn status(&self, id: OrderId) -> Option<OrderStatus> {
        self.state.lock().await.ledger.status(id)
    }

    /// Orders withdrawn from assignment.
    pub async fn rejected(&self) -> Vec<(OrderId, RejectionReason)> {
        self.state.lock().await.ledger.rejected().collect()
    }

    /// Copy of the ledger as it stands.
    pub async fn snapshot(&self) -> Ledger {
        self.state.lock().await.ledger.clone()
    }
}
