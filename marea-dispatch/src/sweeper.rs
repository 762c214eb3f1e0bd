use chrono::{DateTime, Duration, Utc};
use marea_core::DomainError;
use std::sync::Arc;

use crate::lifecycle::{CascadeReason, OfferLifecycle};
use crate::models::LiveRideStatus;
use crate::repository::{CascadeOutcome, DispatchStore};

/// Scans for offers outstanding past the timeout and cascades each to the
/// next candidate. Runs opportunistically at the start of every live-ride
/// entry point and from the background worker; both paths share the same
/// transaction-guarded cascade, so double invocation is harmless.
#[derive(Clone)]
pub struct ExpirySweeper {
    store: Arc<dyn DispatchStore>,
    lifecycle: OfferLifecycle,
    timeout: Duration,
}

impl ExpirySweeper {
    pub fn new(store: Arc<dyn DispatchStore>, lifecycle: OfferLifecycle, timeout: Duration) -> Self {
        Self {
            store,
            lifecycle,
            timeout,
        }
    }

    /// Expire every open offer older than the timeout whose request is still
    /// offered on that captain. Returns how many offers were terminated.
    ///
    /// A failure on one offer is logged and skipped so the rest of the sweep
    /// (and the caller's primary operation) still proceeds.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, DomainError> {
        let cutoff = now - self.timeout;
        let stale = self.store.open_offers_created_before(cutoff).await?;

        let mut expired = 0;
        for offer in stale {
            let request = match self.store.get_request(offer.request_id).await {
                Ok(Some(request)) => request,
                Ok(None) => continue,
                Err(err) => {
                    tracing::warn!(
                        offer_id = %offer.id,
                        error = %err,
                        "failed to load request during expiry sweep"
                    );
                    continue;
                }
            };

            // A concurrent accept/reject may already have superseded this
            // offer; only the request's current offer is sweepable.
            if request.status != LiveRideStatus::Offered
                || request.offered_to_captain_id != Some(offer.captain_id)
            {
                continue;
            }

            match self
                .lifecycle
                .terminate_and_cascade(&request, &offer, CascadeReason::Timeout, now)
                .await
            {
                Ok(CascadeOutcome::Superseded) => {}
                Ok(_) => expired += 1,
                Err(err) => {
                    tracing::warn!(
                        offer_id = %offer.id,
                        request_id = %request.id,
                        error = %err,
                        "expiry cascade failed, skipping offer"
                    );
                }
            }
        }

        Ok(expired)
    }
}
