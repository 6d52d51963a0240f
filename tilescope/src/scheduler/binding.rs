//! Region event subscription as a bound resource.

use tracing::{debug, info};

use crate::host::{HostResult, RegionEventBus, RegionId, SubscriptionToken};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Bound {
    region: RegionId,
    token: SubscriptionToken,
}

/// Holds at most one region subscription.
///
/// Attaching to a different region always detaches the old one first, so a
/// handler set is never registered twice.
pub struct RegionBinding {
    bus: Box<dyn RegionEventBus>,
    current: Option<Bound>,
}

impl RegionBinding {
    pub fn new(bus: Box<dyn RegionEventBus>) -> Self {
        Self { bus, current: None }
    }

    /// The region currently bound, if any.
    pub fn current_target(&self) -> Option<RegionId> {
        self.current.map(|b| b.region)
    }

    /// The region the host is displaying now.
    pub fn displayed_region(&self) -> HostResult<Option<RegionId>> {
        self.bus.current_region()
    }

    /// Bind to `region`. Returns `true` if a new subscription was made.
    pub fn attach(&mut self, region: RegionId) -> HostResult<bool> {
        if self.current_target() == Some(region) {
            return Ok(false);
        }
        self.detach();
        let token = self.bus.subscribe(region)?;
        self.current = Some(Bound { region, token });
        info!(%region, "Attached region event handlers");
        Ok(true)
    }

    /// Drop the current subscription. Returns the region it was bound to.
    pub fn detach(&mut self) -> Option<RegionId> {
        let bound = self.current.take()?;
        self.bus.unsubscribe(bound.token);
        debug!(region = %bound.region, "Detached region event handlers");
        Some(bound.region)
    }
}

impl std::fmt::Debug for RegionBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionBinding")
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}
