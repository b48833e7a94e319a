//! ChangeDispatcher - trigger entry point and the dispatch loop

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use contracts::{
    ChangeRecord, ContractError, DispatcherConfig, OutboundMessage, RoutedEntity, TopicAdmin,
    TopicClient, TopicConnector,
};

use crate::backoff::Backoff;
use crate::codec;
use crate::error::DispatcherError;
use crate::metrics::{DispatcherMetrics, MetricsSnapshot};
use crate::provisioner::{self, ProvisionOutcome};
use crate::queue::PendingQueue;
use crate::run_state::{RunGuard, RunState};

/// Publishes entity changes to a topic, in order, retrying until delivered
///
/// Cloning is cheap; clones share the queue and the run state.
pub struct ChangeDispatcher<C: TopicConnector> {
    inner: Arc<Inner<C>>,
}

struct Inner<C: TopicConnector> {
    config: DispatcherConfig,
    connector: C,
    queue: PendingQueue,
    run_state: RunState,
    shutdown: watch::Sender<bool>,
    metrics: DispatcherMetrics,
    runtime: Handle,
}

impl<C: TopicConnector> Clone for ChangeDispatcher<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: TopicConnector> ChangeDispatcher<C> {
    /// Provision the topic and build a dispatcher on the current runtime
    ///
    /// # Errors
    /// - Topic listing/creation failed (other than "already exists")
    /// - Not called from within a tokio runtime
    #[instrument(
        name = "change_dispatcher_new",
        skip(config, admin, connector),
        fields(topic = %config.topic)
    )]
    pub async fn new<A: TopicAdmin>(
        config: DispatcherConfig,
        admin: &A,
        connector: C,
    ) -> Result<Self, DispatcherError> {
        let runtime = Handle::try_current()?;

        let outcome = provisioner::ensure_topic_exists(admin, &config.topic, config.topic_size_mb)
            .await
            .map_err(|e| DispatcherError::provisioning(&config.topic, e))?;
        observability::record_topic_provisioned(&config.topic, outcome.as_str());
        if outcome == ProvisionOutcome::Created {
            info!(topic = %config.topic, size_mb = config.topic_size_mb, "Topic provisioned");
        }

        Ok(Self::from_parts(config, connector, runtime))
    }

    /// Build a dispatcher without provisioning (topic managed elsewhere)
    pub fn from_parts(config: DispatcherConfig, connector: C, runtime: Handle) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                config,
                connector,
                queue: PendingQueue::new(),
                run_state: RunState::new(),
                shutdown,
                metrics: DispatcherMetrics::new(),
                runtime,
            }),
        }
    }

    /// Enqueue the changes of one unit of work and start delivery
    ///
    /// Unchanged/detached records are skipped. Returns immediately; delivery
    /// happens on a background task. If a loop is already running it picks up
    /// the new messages.
    ///
    /// # Errors
    /// - A record could not be encoded (nothing from this call is enqueued)
    /// - The dispatcher was shut down
    pub fn dispatch_changes<E, I>(&self, records: I) -> Result<usize, DispatcherError>
    where
        E: RoutedEntity,
        I: IntoIterator<Item = ChangeRecord<E>>,
    {
        if self.inner.is_shut_down() {
            return Err(DispatcherError::ShutDown);
        }

        let messages = codec::encode_all(records)?;
        let count = messages.len();
        if count > 0 {
            self.inner.enqueue(messages);
        }

        if !self.inner.queue.is_empty() {
            self.start_if_idle();
        }
        Ok(count)
    }

    /// Spawn a dispatch loop unless one is active
    ///
    /// Returns whether a new loop was started.
    fn start_if_idle(&self) -> bool {
        match self.inner.run_state.try_acquire() {
            Some(guard) => {
                let inner = Arc::clone(&self.inner);
                self.inner.runtime.spawn(inner.run(guard));
                true
            }
            None => {
                debug!(topic = %self.inner.config.topic, "Dispatch loop already active");
                false
            }
        }
    }

    /// Whether a dispatch loop is currently running
    pub fn is_dispatching(&self) -> bool {
        self.inner.run_state.is_active()
    }

    /// Number of undelivered messages
    pub fn pending_len(&self) -> usize {
        self.inner.queue.len()
    }

    /// Undelivered messages, front first
    pub fn pending_messages(&self) -> Vec<OutboundMessage> {
        self.inner.queue.snapshot()
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.inner.config
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// Wait until the queue is drained and no loop is running
    ///
    /// Also returns once the dispatcher is shut down.
    pub async fn wait_until_idle(&self) {
        loop {
            self.inner.run_state.wait_idle().await;
            if self.inner.queue.is_empty() || self.inner.is_shut_down() {
                return;
            }
            // A trigger or a finishing loop is about to take the slot.
            tokio::task::yield_now().await;
        }
    }

    /// Stop delivery and wait for the active loop to finish
    ///
    /// The loop stops between messages or during a backoff sleep, never in
    /// the middle of a send. Undelivered messages stay queued; their count is
    /// returned.
    #[instrument(name = "change_dispatcher_shutdown", skip(self), fields(topic = %self.inner.config.topic))]
    pub async fn shutdown(&self) -> usize {
        self.inner.shutdown.send_replace(true);
        self.inner.run_state.wait_idle().await;

        let pending = self.inner.queue.len();
        if pending > 0 {
            warn!(pending, "Dispatcher shut down with undelivered messages");
        } else {
            info!("Dispatcher shutdown complete");
        }
        pending
    }
}

impl<C: TopicConnector> Inner<C> {
    fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    fn enqueue(&self, messages: Vec<OutboundMessage>) {
        let count = messages.len();
        let depth = self
            .queue
            .enqueue_all_with(messages, |depth| self.report_depth(depth));

        self.metrics.add_enqueued(count);
        observability::record_messages_enqueued(&self.config.topic, count);
        debug!(topic = %self.config.topic, count, depth, "Messages enqueued");
    }

    /// Background task owning the active slot
    ///
    /// After releasing the slot the queue is checked again: a trigger that
    /// enqueued while this loop was finishing saw it as active and did not
    /// start one.
    async fn run(self: Arc<Self>, mut guard: RunGuard) {
        loop {
            self.metrics.inc_loops_started();
            observability::record_dispatch_loop_started(&self.config.topic);

            self.drain().await;
            drop(guard);

            if self.queue.is_empty() || self.is_shut_down() {
                return;
            }
            match self.run_state.try_acquire() {
                Some(next) => guard = next,
                None => return,
            }
        }
    }

    /// Send from the front of the queue until it is empty
    #[instrument(name = "dispatch_loop", skip(self), fields(topic = %self.config.topic))]
    async fn drain(&self) {
        info!(pending = self.queue.len(), "Dispatch loop started");

        let mut shutdown = self.shutdown.subscribe();
        let mut backoff = Backoff::new(self.config.retry);
        let mut client: Option<C::Client> = None;
        let mut attempt: u64 = 0;

        loop {
            if self.is_shut_down() {
                debug!("Shutdown requested, leaving dispatch loop");
                break;
            }
            let Some(message) = self.queue.peek_front() else {
                break;
            };
            attempt += 1;

            let result = match self.client(&mut client) {
                Ok(c) => c.send(&message).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => {
                    self.on_sent(&message, attempt);
                    backoff.reset();
                    attempt = 0;
                }
                Err(e) => {
                    self.on_send_failed(&message, attempt, &e);
                    let delay = backoff.next_delay();
                    observability::record_backoff(&self.config.topic, delay);
                    debug!(
                        message_id = %message.id,
                        delay_ms = delay.as_millis() as u64,
                        "Backing off before retry"
                    );

                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown.wait_for(|stop| *stop) => {}
                    }
                }
            }
        }

        if let Some(mut client) = client.take() {
            if let Err(e) = client.close().await {
                self.metrics.inc_close_failure_count();
                observability::record_close_failure(&self.config.topic);
                error!(error = %e, detail = ?e, "Close of topic client failed");
            }
        }

        info!(pending = self.queue.len(), "Dispatch loop finished");
    }

    /// Open the client on first use
    fn client<'a>(
        &self,
        slot: &'a mut Option<C::Client>,
    ) -> Result<&'a mut C::Client, ContractError> {
        let client = match slot.take() {
            Some(client) => client,
            None => {
                let client = self
                    .connector
                    .connect(&self.config.connection_string, &self.config.topic)?;
                debug!("Topic client opened");
                client
            }
        };
        Ok(slot.insert(client))
    }

    /// Called with the queue lock held
    fn report_depth(&self, depth: usize) {
        self.metrics.set_queue_len(depth);
        observability::record_queue_depth(&self.config.topic, depth);
    }

    fn on_sent(&self, message: &OutboundMessage, attempt: u64) {
        let mut depth = 0;
        self.queue.remove_with(message.id, |d| {
            depth = d;
            self.report_depth(d);
        });

        let latency = (chrono::Utc::now() - message.enqueued_at)
            .to_std()
            .unwrap_or_default();
        self.metrics.inc_sent_count();
        observability::record_message_sent(&self.config.topic, latency);

        debug!(
            message_id = %message.id,
            label = %message.label,
            attempt,
            depth,
            "Message sent"
        );
    }

    fn on_send_failed(&self, message: &OutboundMessage, attempt: u64, e: &ContractError) {
        self.metrics.inc_failure_count();
        observability::record_send_failure(&self.config.topic, e.is_connectivity());

        error!(
            message_id = %message.id,
            label = %message.label,
            attempt,
            error = %e,
            detail = ?e,
            "Error in send task"
        );
        if e.is_connectivity() {
            warn!(
                message_id = %message.id,
                "Connection problem with host, internet connection may be down"
            );
        }
    }
}
