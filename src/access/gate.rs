//! Access capability gate
//!
//! An [`AccessGate`] wraps a renderable unit together with the capabilities it
//! requires. Mounting the gate starts one check per distinct `(verb, resource)`
//! pair; the child is only revealed once every check has come back allowed.
//! Anything else (a denial, a failed request, a pending check) keeps the child
//! hidden.
//!
//! Each mount owns its own [`GateState`] and [`CancellationToken`]. Unmounting
//! or re-mounting cancels the in-flight checks, and a result that arrives
//! afterwards is discarded without touching any state.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::requirement::{CapabilityRequirement, CapabilityRequirements};
use super::service::CapabilityService;
use crate::Result;

/// Resolution state of one gate mount
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GateState {
    /// Every check has come back (or the gate had nothing to check)
    pub resolved: bool,
    /// Every requirement was allowed
    pub access: bool,
}

impl GateState {
    const GRANTED: Self = Self {
        resolved: true,
        access: true,
    };

    /// Whether the child may be rendered
    #[must_use]
    pub const fn granted(self) -> bool {
        self.resolved && self.access
    }
}

struct Mount {
    token: CancellationToken,
    state: Arc<watch::Sender<GateState>>,
    service: Arc<dyn CapabilityService>,
    task: Option<JoinHandle<()>>,
}

impl Mount {
    fn cancel(self) {
        // Cancel under the state lock so a resolution lands either before
        // the unmount or not at all
        self.state.send_if_modified(|_| {
            self.token.cancel();
            false
        });
        if let Some(task) = self.task {
            task.abort();
        }
    }
}

/// Renderable unit guarded by a set of capability requirements
pub struct AccessGate<C> {
    child: C,
    requirements: CapabilityRequirements,
    mount: Option<Mount>,
}

impl<C> AccessGate<C> {
    /// Wrap `child` behind `requirements`; the gate starts unmounted
    #[must_use]
    pub const fn new(child: C, requirements: CapabilityRequirements) -> Self {
        Self {
            child,
            requirements,
            mount: None,
        }
    }

    /// Requirements currently declared by the gate
    #[must_use]
    pub const fn requirements(&self) -> &CapabilityRequirements {
        &self.requirements
    }

    /// Whether the gate is mounted
    #[must_use]
    pub const fn is_mounted(&self) -> bool {
        self.mount.is_some()
    }

    /// Mount the gate and start resolving its requirements
    ///
    /// Any previous mount is discarded first; nothing from an earlier
    /// resolution carries over. Must be called from within a tokio runtime.
    pub fn mount(&mut self, service: Arc<dyn CapabilityService>) {
        self.unmount();

        let pairs = self.requirements.pairs();
        if pairs.is_empty() {
            let (tx, _rx) = watch::channel(GateState::GRANTED);
            self.mount = Some(Mount {
                token: CancellationToken::new(),
                state: Arc::new(tx),
                service,
                task: None,
            });
            return;
        }

        let (tx, _rx) = watch::channel(GateState::default());
        let state = Arc::new(tx);
        let token = CancellationToken::new();

        let task = tokio::spawn(resolve(
            pairs,
            Arc::clone(&service),
            Arc::clone(&state),
            token.clone(),
        ));

        self.mount = Some(Mount {
            token,
            state,
            service,
            task: Some(task),
        });
    }

    /// Unmount the gate, cancelling pending checks and dropping its state
    pub fn unmount(&mut self) {
        if let Some(mount) = self.mount.take() {
            mount.cancel();
        }
    }

    /// Replace the requirement set
    ///
    /// A mounted gate restarts its checks from scratch when the set changes.
    pub fn set_requirements(&mut self, requirements: CapabilityRequirements) {
        if requirements == self.requirements {
            return;
        }
        self.requirements = requirements;

        if let Some(service) = self.mount.as_ref().map(|m| Arc::clone(&m.service)) {
            self.mount(service);
        }
    }

    /// Current state; an unmounted gate is unresolved and denied
    #[must_use]
    pub fn state(&self) -> GateState {
        self.mount
            .as_ref()
            .map(|mount| *mount.state.borrow())
            .unwrap_or_default()
    }

    /// Subscribe to state changes of the current mount
    #[must_use]
    pub fn subscribe(&self) -> Option<watch::Receiver<GateState>> {
        self.mount.as_ref().map(|mount| mount.state.subscribe())
    }

    /// Wait for the current mount to resolve
    ///
    /// Returns the default (unresolved, denied) state right away when the
    /// gate is not mounted. Waits indefinitely if a check never answers.
    pub async fn resolved(&self) -> GateState {
        let Some(mut rx) = self.subscribe() else {
            return GateState::default();
        };
        match rx.wait_for(|state| state.resolved).await {
            Ok(state) => *state,
            Err(_) => GateState::default(),
        }
    }

    /// The child, if and only if access has been granted
    #[must_use]
    pub fn render(&self) -> Option<&C> {
        self.state().granted().then_some(&self.child)
    }
}

impl<C> Drop for AccessGate<C> {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl<C: fmt::Debug> fmt::Debug for AccessGate<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessGate")
            .field("child", &self.child)
            .field("requirements", &self.requirements)
            .field("state", &self.state())
            .finish()
    }
}

async fn resolve(
    pairs: Vec<CapabilityRequirement>,
    service: Arc<dyn CapabilityService>,
    state: Arc<watch::Sender<GateState>>,
    token: CancellationToken,
) {
    let results = tokio::select! {
        biased;
        () = token.cancelled() => return,
        results = service.check_all(&pairs) => results,
    };

    let access = aggregate(&pairs, &results);

    state.send_if_modified(|current| {
        if token.is_cancelled() {
            return false;
        }
        *current = GateState {
            resolved: true,
            access,
        };
        true
    });
}

/// Allowed only if every pair came back allowed; fail closed otherwise
fn aggregate(pairs: &[CapabilityRequirement], results: &[Result<bool>]) -> bool {
    if results.len() != pairs.len() {
        tracing::warn!(
            expected = pairs.len(),
            received = results.len(),
            "capability service answered a partial batch, denying"
        );
        return false;
    }

    let mut access = true;
    for (pair, result) in pairs.iter().zip(results) {
        match result {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(requirement = %pair, "capability denied");
                access = false;
            }
            Err(e) => {
                tracing::warn!(requirement = %pair, error = %e, "capability check failed, denying");
                access = false;
            }
        }
    }
    access
}
