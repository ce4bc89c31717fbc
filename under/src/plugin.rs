//! The plugin subsystem.
//!
//! A [`Plugin`] is registered on a [`crate::Router`] (via
//! [`crate::Router::plugin`]) before [`crate::Router::listen`] is called.
//! Every registered plugin moves through `Registered -> Initializing ->
//! Ready | Failed`: the first call to reach the router's plugin manager -
//! whether that's [`Router::listen`]'s background task or a direct
//! [`Router::handle`] call with no `listen` in sight - drives every plugin's
//! [`Plugin::on_init`] in registration order, logs (and otherwise ignores)
//! any that fail, and [`Router::listen`] disposes every `Ready` plugin in
//! reverse order at shutdown.

use crate::event::EventBus;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};

/// A piece of server-wide initialization/teardown logic, run once around the
/// lifetime of a [`crate::Router`].
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    /// A short name used in log messages if this plugin fails to initialize.
    fn name(&self) -> &str;

    /// Runs this plugin's initialization. May return a [`Dispose`] handle,
    /// which is run (in reverse registration order, alongside every other
    /// `Ready` plugin's handle) when the router shuts down.
    async fn on_init(&self, ctx: &PluginContext) -> Result<Option<Box<dyn Dispose>>, anyhow::Error>;
}

#[async_trait]
/// A plugin's teardown handle, returned from a successful [`Plugin::on_init`].
pub trait Dispose: Send + Sync + 'static {
    async fn dispose(&self);
}

/// What a plugin's [`Plugin::on_init`] is given access to: the shared event
/// bus, so it can subscribe to `server:request`/`server:response` (or any
/// channel another plugin emits on).
pub struct PluginContext {
    pub(crate) events: Arc<EventBus>,
}

impl PluginContext {
    /// Subscribes `subscriber` to `channel`.
    pub fn on(&self, channel: &'static str, subscriber: Arc<dyn crate::event::Subscriber>) {
        self.events.subscribe(channel, subscriber);
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Phase {
    Registered,
    Initializing,
    Ready,
    Failed,
}

struct Entry {
    plugin: Arc<dyn Plugin>,
    phase: Phase,
    dispose: Option<Box<dyn Dispose>>,
}

/// Owns the registered plugins and drives their init/dispose lifecycle.
///
/// The entry list is guarded by a `tokio::sync::RwLock`: write-locked only
/// while registering (before [`Router::listen`](crate::Router::listen)) and
/// during init/dispose, read nowhere else - readiness itself is observed
/// through a `tokio::sync::watch` channel, the same mechanism the router
/// uses for its own graceful-shutdown signal.
pub(crate) struct PluginManager {
    entries: RwLock<Vec<Entry>>,
    ready_tx: watch::Sender<bool>,
    ready_rx: watch::Receiver<bool>,
}

impl PluginManager {
    pub(crate) fn new(plugins: Vec<Arc<dyn Plugin>>) -> Self {
        let (ready_tx, ready_rx) = watch::channel(plugins.is_empty());
        let entries = plugins
            .into_iter()
            .map(|plugin| Entry {
                plugin,
                phase: Phase::Registered,
                dispose: None,
            })
            .collect();
        PluginManager {
            entries: RwLock::new(entries),
            ready_tx,
            ready_rx,
        }
    }

    /// Runs every registered plugin's `on_init`, in registration order. A
    /// plugin that fails is logged and marked `Failed`; the rest continue
    /// uninterrupted. Broadcasts readiness once every plugin has settled,
    /// releasing anything blocked in [`Self::wait_ready`].
    pub(crate) async fn init_all(&self, events: Arc<EventBus>) {
        let ctx = PluginContext { events };
        let mut entries = self.entries.write().await;
        for entry in entries.iter_mut() {
            entry.phase = Phase::Initializing;
            match entry.plugin.on_init(&ctx).await {
                Ok(dispose) => {
                    entry.phase = Phase::Ready;
                    entry.dispose = dispose;
                }
                Err(error) => {
                    log::error!("plugin {:?} failed to initialize: {:#}", entry.plugin.name(), error);
                    entry.phase = Phase::Failed;
                }
            }
        }
        drop(entries);
        let _ = self.ready_tx.send(true);
    }

    /// Disposes every `Ready` plugin, in reverse registration order.
    pub(crate) async fn dispose_all(&self) {
        let mut entries = self.entries.write().await;
        for entry in entries.iter_mut().rev() {
            if entry.phase == Phase::Ready {
                if let Some(dispose) = entry.dispose.take() {
                    dispose.dispose().await;
                }
            }
        }
    }

    /// Resolves once initialization has completed (successfully or not) for
    /// every plugin - the plugin-init barrier requests wait on before being
    /// dispatched.
    pub(crate) async fn wait_ready(&self) {
        let mut rx = self.ready_rx.clone();
        if *rx.borrow() {
            return;
        }
        let _ = rx.changed().await;
    }
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginManager").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Good(Arc<AtomicUsize>);

    #[async_trait]
    impl Plugin for Good {
        fn name(&self) -> &str {
            "good"
        }

        async fn on_init(&self, _ctx: &PluginContext) -> Result<Option<Box<dyn Dispose>>, anyhow::Error> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Some(Box::new(Teardown(self.0.clone()))))
        }
    }

    struct Teardown(Arc<AtomicUsize>);

    #[async_trait]
    impl Dispose for Teardown {
        async fn dispose(&self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    struct Bad;

    #[async_trait]
    impl Plugin for Bad {
        fn name(&self) -> &str {
            "bad"
        }

        async fn on_init(&self, _ctx: &PluginContext) -> Result<Option<Box<dyn Dispose>>, anyhow::Error> {
            Err(anyhow::anyhow!("nope"))
        }
    }

    #[tokio::test]
    async fn ready_after_init_even_with_a_failure() {
        let count = Arc::new(AtomicUsize::new(0));
        let manager = PluginManager::new(vec![Arc::new(Good(count.clone())), Arc::new(Bad)]);
        manager.init_all(Arc::new(EventBus::new())).await;
        manager.wait_ready().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dispose_runs_only_ready_plugins() {
        let count = Arc::new(AtomicUsize::new(0));
        let manager = PluginManager::new(vec![Arc::new(Good(count.clone())), Arc::new(Bad)]);
        manager.init_all(Arc::new(EventBus::new())).await;
        manager.dispose_all().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_registry_is_immediately_ready() {
        let manager = PluginManager::new(vec![]);
        manager.wait_ready().await;
    }
}
