//! Query correlation: one emitted event in, one awaited reply out.
//!
//! The transport only knows "emit an event" and "call me when an event
//! arrives". A query pairs the two: emit `request`, then wait for whichever
//! comes first of
//!
//! ```text
//!   <request>_response ──→ Ok(payload)
//!   <request>_error    ──→ error callbacks(payload), Err(Rejected)
//!   timer (T)          ──→ error callbacks({"code":"timeout"}), Err(Timeout)
//! ```
//!
//! # Settling exactly once
//!
//! Both temporary listeners share one slot holding the `oneshot` sender.
//! Whichever listener fires first takes the sender out; anything after that
//! finds the slot empty and does nothing. The timer is the `timeout` around
//! the receiver, so it loses automatically once a reply is in.
//!
//! The error listener runs the error callbacks itself, at the moment it wins
//! the slot. A caller that drops the query future right after the server
//! rejected it still leaves every error callback notified.
//!
//! # Cleanup
//!
//! A [`PendingQuery`] guard owns the temporary subscriptions (and the
//! single-flight slot). Dropping it unsubscribes both listeners, which
//! happens on every exit path: reply, timeout, failed emit, or the caller
//! dropping the query future mid-wait.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use roomlink_protocol::Payload;
use roomlink_protocol::events::{error_event, response_event};
use roomlink_transport::{EventTransport, Listener};
use tokio::sync::oneshot;

use crate::error::timeout_payload;
use crate::{ClientError, CorrelationMode, SubscriptionRegistry};

/// What settled a query.
#[derive(Debug)]
enum Reply {
    Response(Payload),
    Error(Payload),
}

/// The sender half, taken by whichever listener fires first.
type SettleSlot = Arc<Mutex<Option<oneshot::Sender<Reply>>>>;

/// Takes the sender out of `slot`. `None` once the query has settled.
fn claim(slot: &SettleSlot) -> Option<oneshot::Sender<Reply>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}

fn settle(slot: &SettleSlot, reply: Reply) {
    if let Some(tx) = claim(slot) {
        // The receiver is gone only if the query future was dropped.
        let _ = tx.send(reply);
    }
}

/// Listener for `<request>_error`: settles the query and, if it won,
/// notifies the error callbacks.
///
/// The registry is held weakly: it owns the transport, which owns this
/// listener.
fn error_listener<T: EventTransport>(
    slot: SettleSlot,
    registry: Weak<SubscriptionRegistry<T>>,
) -> Listener {
    Listener::new(move |payload| {
        let Some(tx) = claim(&slot) else {
            return;
        };
        if let Some(registry) = registry.upgrade() {
            registry.notify_errors(payload);
        }
        let _ = tx.send(Reply::Error(payload.clone()));
    })
}

/// Turns emitted events into awaitable request/reply calls.
pub struct QueryCorrelator<T: EventTransport> {
    registry: Arc<SubscriptionRegistry<T>>,
    timeout: Duration,
    mode: CorrelationMode,
    in_flight: Mutex<HashSet<String>>,
}

impl<T: EventTransport> QueryCorrelator<T> {
    /// A correlator subscribing through `registry`.
    pub fn new(
        registry: Arc<SubscriptionRegistry<T>>,
        timeout: Duration,
        mode: CorrelationMode,
    ) -> Self {
        Self {
            registry,
            timeout,
            mode,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// The reply deadline applied to every query.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Names of the queries currently pending (single-flight mode only).
    pub fn in_flight(&self) -> Vec<String> {
        self.in_flight_set().iter().cloned().collect()
    }

    /// Emits `request` with `args` and waits for its reply.
    ///
    /// # Errors
    /// - [`ClientError::Rejected`]: the server sent `<request>_error`
    /// - [`ClientError::Timeout`]: no reply within the timeout
    /// - [`ClientError::AlreadyInFlight`]: single-flight mode, same name pending
    /// - [`ClientError::Transport`]: the emit itself failed
    ///
    /// `Rejected` and `Timeout` are also delivered to every error callback
    /// before this returns.
    pub async fn query(
        &self,
        request: &str,
        args: Payload,
    ) -> Result<Payload, ClientError> {
        let single_flight = self.mode == CorrelationMode::SingleFlight;
        if single_flight && !self.in_flight_set().insert(request.to_string()) {
            tracing::debug!(request, "rejecting concurrent query");
            return Err(ClientError::AlreadyInFlight {
                request: request.to_string(),
            });
        }

        let (tx, rx) = oneshot::channel();
        let slot: SettleSlot = Arc::new(Mutex::new(Some(tx)));
        let pending = PendingQuery {
            correlator: self,
            request,
            response_event: response_event(request),
            error_event: error_event(request),
            on_response: {
                let slot = Arc::clone(&slot);
                Listener::new(move |p| settle(&slot, Reply::Response(p.clone())))
            },
            on_error: error_listener(
                Arc::clone(&slot),
                Arc::downgrade(&self.registry),
            ),
            owns_flight_slot: single_flight,
        };

        // Listen before emitting, so a fast reply can't slip past.
        pending.subscribe();
        self.registry.transport().emit(request, args)?;
        tracing::debug!(request, "query emitted");

        let outcome = tokio::time::timeout(self.timeout, rx).await;
        drop(pending);

        match outcome {
            Ok(Ok(Reply::Response(payload))) => {
                tracing::debug!(request, "query resolved");
                Ok(payload)
            }
            Ok(Ok(Reply::Error(payload))) => {
                // The error listener already notified the error callbacks.
                tracing::debug!(request, %payload, "query rejected");
                Err(ClientError::Rejected {
                    request: request.to_string(),
                    payload,
                })
            }
            Ok(Err(_)) => unreachable!(
                "{request}: reply sender dropped unsent; a listener that takes it always sends"
            ),
            Err(_) => {
                // Late replies now find an empty slot.
                claim(&slot);
                tracing::warn!(request, timeout = ?self.timeout, "query timed out");
                self.registry.notify_errors(&timeout_payload());
                Err(ClientError::Timeout {
                    request: request.to_string(),
                    timeout: self.timeout,
                })
            }
        }
    }

    fn in_flight_set(&self) -> MutexGuard<'_, HashSet<String>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The transient state of one query. Dropping it undoes its registrations.
struct PendingQuery<'a, T: EventTransport> {
    correlator: &'a QueryCorrelator<T>,
    request: &'a str,
    response_event: String,
    error_event: String,
    on_response: Listener,
    on_error: Listener,
    owns_flight_slot: bool,
}

impl<T: EventTransport> PendingQuery<'_, T> {
    fn subscribe(&self) {
        let registry = &self.correlator.registry;
        registry.subscribe(&self.response_event, self.on_response.clone());
        registry.subscribe(&self.error_event, self.on_error.clone());
    }
}

impl<T: EventTransport> Drop for PendingQuery<'_, T> {
    fn drop(&mut self) {
        let registry = &self.correlator.registry;
        registry.unsubscribe(&self.response_event, &self.on_response);
        registry.unsubscribe(&self.error_event, &self.on_error);
        if self.owns_flight_slot {
            self.correlator.in_flight_set().remove(self.request);
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the correlator against a loopback transport.
    //!
    //! Timeout tests run on paused time (`start_paused = true`): the runtime
    //! jumps the clock forward whenever every task is idle, so a 5 s timeout
    //! completes instantly and deterministically.

    use roomlink_transport::{ConnectOptions, MemoryTransport};
    use serde_json::json;

    use super::*;

    fn correlator(
        mode: CorrelationMode,
    ) -> (QueryCorrelator<MemoryTransport>, MemoryTransport) {
        let transport =
            MemoryTransport::new(ConnectOptions::new("ws://127.0.0.1:3000/"));
        let registry =
            Arc::new(SubscriptionRegistry::new(Arc::new(transport.clone())));
        (
            QueryCorrelator::new(registry, Duration::from_millis(5000), mode),
            transport,
        )
    }

    #[tokio::test]
    async fn test_query_emits_request_with_args() {
        let (q, transport) = correlator(CorrelationMode::SingleFlight);

        let (result, ()) = tokio::join!(
            q.query("setPlayer", json!({ "playerName": "Al" })),
            async {
                let frame = transport.wait_for_emit("setPlayer", 1).await;
                assert_eq!(frame.data["playerName"], "Al");
                transport.deliver("setPlayer_response", json!(true));
            }
        );

        assert_eq!(result.unwrap(), json!(true));
    }

    #[tokio::test]
    async fn test_query_listens_before_emitting() {
        // A transport that answers synchronously inside `emit` would beat
        // any listener registered afterwards. Check both reply listeners are
        // already in place by the time the frame is out.
        let (q, transport) = correlator(CorrelationMode::SingleFlight);

        let (result, ()) = tokio::join!(q.query("getRoom", json!(null)), async {
            transport.wait_for_emit("getRoom", 1).await;
            assert_eq!(transport.listener_count("getRoom_response"), 1);
            assert_eq!(transport.listener_count("getRoom_error"), 1);
            transport.deliver("getRoom_response", json!({}));
        });

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_query_error_reply_notifies_then_rejects() {
        let (q, transport) = correlator(CorrelationMode::SingleFlight);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        q.registry.subscribe(
            "error",
            Listener::new(move |p| sink.lock().unwrap().push(p.clone())),
        );

        let (result, ()) = tokio::join!(q.query("leaveRoom", json!(null)), async {
            transport.wait_for_emit("leaveRoom", 1).await;
            transport.deliver("leaveRoom_error", json!({ "code": "not_in_room" }));
        });

        let err = result.unwrap_err();
        assert_eq!(err.code().as_deref(), Some("not_in_room"));
        assert_eq!(*seen.lock().unwrap(), vec![json!({ "code": "not_in_room" })]);
    }

    #[tokio::test]
    async fn test_query_first_reply_wins() {
        // Response and error arrive back to back in the same dispatch turn;
        // the first one settles, the second is inert.
        let (q, transport) = correlator(CorrelationMode::SingleFlight);
        let errors = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&errors);
        q.registry
            .subscribe("error", Listener::new(move |_| *sink.lock().unwrap() += 1));

        let (result, ()) = tokio::join!(q.query("getRoom", json!(null)), async {
            transport.wait_for_emit("getRoom", 1).await;
            transport.deliver("getRoom_response", json!("first"));
            transport.deliver("getRoom_error", json!("second"));
        });

        assert_eq!(result.unwrap(), json!("first"));
        assert_eq!(*errors.lock().unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_timeout_rejects_and_cleans_up() {
        let (q, transport) = correlator(CorrelationMode::SingleFlight);

        let err = q.query("startGame", json!(null)).await.unwrap_err();

        assert!(matches!(err, ClientError::Timeout { ref request, .. } if request == "startGame"));
        assert_eq!(err.payload(), Some(json!({ "code": "timeout" })));
        assert_eq!(transport.total_listeners(), 0);
        assert!(q.in_flight().is_empty());
    }

    #[tokio::test]
    async fn test_query_emit_failure_cleans_up() {
        let (q, transport) = correlator(CorrelationMode::SingleFlight);
        transport.close().await.unwrap();

        let err = q.query("getRoom", json!(null)).await.unwrap_err();

        assert!(matches!(err, ClientError::Transport(_)));
        assert_eq!(transport.total_listeners(), 0);
        assert!(q.in_flight().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_query_future_removes_listeners() {
        let (q, transport) = correlator(CorrelationMode::SingleFlight);

        {
            let fut = q.query("getRoom", json!(null));
            tokio::pin!(fut);
            // Poll once so the query subscribes and emits, then abandon it.
            let _ = futures_poll_once(fut.as_mut()).await;
            assert_eq!(transport.listener_count("getRoom_response"), 1);
        }

        assert_eq!(transport.total_listeners(), 0);
        assert!(q.in_flight().is_empty());
    }

    #[tokio::test]
    async fn test_error_reply_notifies_even_if_future_dropped() {
        let (q, transport) = correlator(CorrelationMode::SingleFlight);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        q.registry.subscribe(
            "error",
            Listener::new(move |p| sink.lock().unwrap().push(p.clone())),
        );

        {
            let fut = q.query("joinRoom", json!({ "roomCode": "ZZZZ" }));
            tokio::pin!(fut);
            let _ = futures_poll_once(fut.as_mut()).await;
            let heard =
                transport.deliver("joinRoom_error", json!({ "code": "room_not_found" }));
            assert_eq!(heard, 1);
        }

        assert_eq!(*seen.lock().unwrap(), vec![json!({ "code": "room_not_found" })]);
        assert_eq!(transport.listener_count("joinRoom_error"), 0);
        assert!(q.in_flight().is_empty());
    }

    #[tokio::test]
    async fn test_late_error_after_response_is_inert() {
        let (q, transport) = correlator(CorrelationMode::SingleFlight);
        let errors = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&errors);
        q.registry
            .subscribe("error", Listener::new(move |_| *sink.lock().unwrap() += 1));

        let fut = q.query("getRoom", json!(null));
        tokio::pin!(fut);
        let _ = futures_poll_once(fut.as_mut()).await;
        transport.deliver("getRoom_response", json!({ "roomCode": "AB12" }));
        transport.deliver("getRoom_error", json!({ "code": "late" }));

        assert_eq!(fut.await.unwrap()["roomCode"], "AB12");
        assert_eq!(*errors.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_single_flight_rejects_second_same_name_query() {
        let (q, transport) = correlator(CorrelationMode::SingleFlight);

        let (first, second, ()) = tokio::join!(
            q.query("getRoom", json!(null)),
            async {
                transport.wait_for_emit("getRoom", 1).await;
                q.query("getRoom", json!(null)).await
            },
            async {
                transport.wait_for_emit("getRoom", 1).await;
                tokio::task::yield_now().await;
                transport.deliver("getRoom_response", json!({ "roomCode": "AB12" }));
            }
        );

        assert_eq!(first.unwrap()["roomCode"], "AB12");
        assert!(matches!(second, Err(ClientError::AlreadyInFlight { .. })));
        assert_eq!(transport.emitted_count("getRoom"), 1);
    }

    #[tokio::test]
    async fn test_single_flight_allows_different_names() {
        let (q, transport) = correlator(CorrelationMode::SingleFlight);

        let (room, player, ()) = tokio::join!(
            q.query("getRoom", json!(null)),
            q.query("setPlayer", json!({})),
            async {
                transport.wait_for_emit("setPlayer", 1).await;
                transport.deliver("setPlayer_response", json!("p"));
                transport.deliver("getRoom_response", json!("r"));
            }
        );

        assert_eq!(room.unwrap(), json!("r"));
        assert_eq!(player.unwrap(), json!("p"));
    }

    /// Polls a future exactly once, returning whether it completed.
    async fn futures_poll_once<F: std::future::Future>(
        fut: std::pin::Pin<&mut F>,
    ) -> bool {
        use std::task::Poll;

        let mut fut = Some(fut);
        std::future::poll_fn(move |cx| {
            let ready = fut
                .take()
                .map(|f| f.poll(cx).is_ready())
                .unwrap_or(false);
            Poll::Ready(ready)
        })
        .await
    }
}
