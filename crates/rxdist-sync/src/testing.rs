//! In-process fakes for the engine's external seams.
//!
//! [`FakeIdentity`] stands in for the identity provider and
//! [`ScriptedStrategy`] for a role backend. Both are deterministic under
//! tokio's paused clock, so timing scenarios can be written with plain
//! `sleep` calls.
//!
//! ```rust,ignore
//! let identity = Arc::new(FakeIdentity::signed_in("u1"));
//! let rpc = Arc::new(
//!     ScriptedStrategy::answering("rpc", "ADMIN").with_delay(Duration::from_millis(50)),
//! );
//! ```

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;

use rxdist_core::{AuthEvent, Session, UserId};

use crate::error::{SyncError, SyncResult};
use crate::identity::IdentityProvider;
use crate::resolver::RoleStrategy;

// =============================================================================
// Identity
// =============================================================================

/// Identity provider whose session is set by the test.
pub struct FakeIdentity {
    session: Mutex<Session>,
    events: broadcast::Sender<AuthEvent>,
    unavailable: AtomicBool,
    sign_outs: AtomicUsize,
}

impl FakeIdentity {
    pub fn anonymous() -> Self {
        let (events, _) = broadcast::channel(16);
        FakeIdentity {
            session: Mutex::new(Session::anonymous()),
            events,
            unavailable: AtomicBool::new(false),
            sign_outs: AtomicUsize::new(0),
        }
    }

    pub fn signed_in(user_id: &str) -> Self {
        let identity = Self::anonymous();
        identity.set_user(Some(user_id));
        identity
    }

    /// Replaces the session without emitting an event.
    pub fn set_user(&self, user_id: Option<&str>) {
        let session = match user_id.and_then(|id| UserId::new(id).ok()) {
            Some(id) => Session::signed_in(id),
            None => Session::anonymous(),
        };
        *self.session.lock() = session;
    }

    /// Makes `current_session` fail until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Broadcasts `event`.
    pub fn emit(&self, event: AuthEvent) {
        let _ = self.events.send(event);
    }

    pub fn sign_out_calls(&self) -> usize {
        self.sign_outs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn current_session(&self) -> SyncResult<Session> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SyncError::SessionUnavailable("fake provider offline".into()));
        }
        Ok(self.session.lock().clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    async fn sign_out(&self) -> SyncResult<()> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        self.set_user(None);
        self.emit(AuthEvent::SignedOut);
        Ok(())
    }
}

// =============================================================================
// Role Strategy
// =============================================================================

#[derive(Debug, Clone)]
enum Reply {
    Answer(String),
    Silent,
    Fail(String),
}

#[derive(Debug, Clone)]
struct Step {
    delay: Duration,
    reply: Reply,
}

/// Role backend that plays back queued replies, then a fallback reply.
pub struct ScriptedStrategy {
    name: String,
    script: Mutex<VecDeque<Step>>,
    fallback: Step,
    calls: AtomicUsize,
}

impl ScriptedStrategy {
    fn with_reply(name: &str, reply: Reply) -> Self {
        ScriptedStrategy {
            name: name.to_string(),
            script: Mutex::new(VecDeque::new()),
            fallback: Step {
                delay: Duration::ZERO,
                reply,
            },
            calls: AtomicUsize::new(0),
        }
    }

    /// Always answers `raw`.
    pub fn answering(name: &str, raw: &str) -> Self {
        Self::with_reply(name, Reply::Answer(raw.to_string()))
    }

    /// Always answers "no record".
    pub fn silent(name: &str) -> Self {
        Self::with_reply(name, Reply::Silent)
    }

    /// Always fails with `reason`.
    pub fn failing(name: &str, reason: &str) -> Self {
        Self::with_reply(name, Reply::Fail(reason.to_string()))
    }

    /// Delay applied to the fallback reply.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.fallback.delay = delay;
        self
    }

    /// Queues a one-off answer ahead of the fallback.
    pub fn then_answer(self, delay: Duration, raw: &str) -> Self {
        self.script.lock().push_back(Step {
            delay,
            reply: Reply::Answer(raw.to_string()),
        });
        self
    }

    /// Queues a one-off failure ahead of the fallback.
    pub fn then_fail(self, delay: Duration, reason: &str) -> Self {
        self.script.lock().push_back(Step {
            delay,
            reply: Reply::Fail(reason.to_string()),
        });
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RoleStrategy for ScriptedStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve(&self, _user_id: &UserId) -> SyncResult<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }

        match step.reply {
            Reply::Answer(raw) => Ok(Some(raw)),
            Reply::Silent => Ok(None),
            Reply::Fail(reason) => Err(SyncError::StrategyFailed {
                strategy: self.name.clone(),
                reason,
            }),
        }
    }
}
