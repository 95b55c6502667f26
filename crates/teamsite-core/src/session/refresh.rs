//! Single-flight token refresh and the recurring refresh timer.

use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tokio::runtime::Handle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::{SessionManager, lock};
use crate::api::{ApiError, ApiErrorKind, ApiResult};

/// Outcome of one refresh exchange, shared by every caller that joined it.
pub(super) type SharedRefresh = Shared<BoxFuture<'static, ApiResult<String>>>;

impl SessionManager {
    /// Joins the in-flight refresh, or starts one.
    ///
    /// The exchange runs on its own task so a caller that stops waiting does
    /// not cancel it for the others.
    pub(super) fn shared_refresh(&self) -> SharedRefresh {
        let mut slot = lock(&self.inner.in_flight);
        if let Some(in_flight) = slot.as_ref() {
            debug!("Joining in-flight token refresh");
            return in_flight.clone();
        }

        let manager = self.clone();
        // The slot lock is held until the shared future is stored, so the
        // task cannot clear the slot before it is filled.
        let task = tokio::spawn(async move {
            let outcome = manager.exchange_refresh_token().await;
            lock(&manager.inner.in_flight).take();
            outcome
        });

        let shared = async move {
            task.await.unwrap_or_else(|e| {
                Err(ApiError::new(
                    ApiErrorKind::Network,
                    format!("Token refresh task failed: {e}"),
                ))
            })
        }
        .boxed()
        .shared();

        *slot = Some(shared.clone());
        shared
    }

    async fn exchange_refresh_token(&self) -> ApiResult<String> {
        let (refresh, epoch) = {
            let state = lock(&self.inner.state);
            (state.session.refresh_token.clone(), state.epoch)
        };

        let Some(refresh) = refresh else {
            self.clear();
            return Err(ApiError::not_authenticated());
        };

        match self.inner.auth.refresh(&refresh).await {
            Ok(response) => {
                let mut state = lock(&self.inner.state);
                if state.epoch != epoch {
                    debug!("Discarding refreshed token for a session that has ended");
                    return Err(ApiError::session_ended());
                }

                // Without rotation the backend omits `refresh`; keep ours.
                let refresh = response.refresh.unwrap_or(refresh);
                if let Err(e) = self.inner.store.save(&response.access, &refresh) {
                    warn!("Failed to persist refreshed tokens: {e:#}");
                }
                self.inner.api.set_bearer(&response.access);
                state.session.access_token = Some(response.access.clone());
                state.session.refresh_token = Some(refresh);
                info!("Access token refreshed");
                Ok(response.access)
            }
            Err(e) => {
                warn!("Token refresh failed: {e}");
                let current = lock(&self.inner.state).epoch == epoch;
                if !current {
                    return Err(ApiError::session_ended());
                }
                self.logout().await;
                Err(e)
            }
        }
    }

    /// (Re)arms the refresh timer with a full period before the first tick.
    pub(super) fn restart_scheduler(&self) {
        let Ok(runtime) = Handle::try_current() else {
            warn!("No async runtime; silent token refresh disabled");
            return;
        };

        let period = self.inner.refresh_interval;
        let weak = Arc::downgrade(&self.inner);
        let handle = runtime.spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let manager = SessionManager { inner };
                debug!("Scheduled token refresh");
                if let Err(e) = manager.refresh_access_token().await {
                    debug!("Scheduled refresh did not complete: {e}");
                }
            }
        });

        if let Some(previous) = lock(&self.inner.scheduler).replace(handle) {
            previous.abort();
        }
    }

    pub(super) fn stop_scheduler(&self) {
        if let Some(handle) = lock(&self.inner.scheduler).take() {
            handle.abort();
        }
    }
}
