//! Caller-facing response stream for one turn.
//!
//! Wraps the backend's raw chunk stream: every chunk is forwarded as a
//! [`SessionEvent::Delta`] as soon as it arrives (text deltas pass through
//! [`ThinkFilter`]), and after the backend stream ends a single
//! [`SessionEvent::Completed`] carries the normalized text and any plan found
//! in it. Nothing is buffered beyond the accumulated text itself.
//!
//! Cancellation is observed before and while waiting for every element. On
//! cancellation the backend session is closed with [`CloseReason::Cancelled`]
//! and the stream ends.

use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use tokio_util::sync::CancellationToken;

use super::backend::{ChunkStream, InferenceBackend};
use super::errors::InferenceError;
use super::normalizer::{clean_content, ThinkFilter};
use super::protocol::{message_type_from_wire, ChatMessageType};
use super::types::{CloseReason, SessionEvent, SessionHandle};
use crate::agent_core::parse_action_plan;

pub type ResponseStream = BoxStream<'static, Result<SessionEvent, InferenceError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Streaming,
    Finishing,
    Done,
}

struct ResponseState {
    backend: Arc<dyn InferenceBackend>,
    session: SessionHandle,
    chunks: ChunkStream,
    cancel: CancellationToken,
    filter: ThinkFilter,
    raw: String,
    phase: Phase,
}

/// Turn a backend chunk stream into the caller-facing event stream.
///
/// The stream is fused: once it has ended, further polls yield `None`.
pub fn response_stream(
    backend: Arc<dyn InferenceBackend>,
    session: SessionHandle,
    chunks: ChunkStream,
    cancel: CancellationToken,
) -> ResponseStream {
    let state = ResponseState {
        backend,
        session,
        chunks,
        cancel,
        filter: ThinkFilter::new(),
        raw: String::new(),
        phase: Phase::Streaming,
    };

    stream::unfold(state, |mut state| async move {
        let item = state.next_event().await?;
        Some((item, state))
    })
    .fuse()
    .boxed()
}

impl ResponseState {
    async fn next_event(&mut self) -> Option<Result<SessionEvent, InferenceError>> {
        loop {
            if self.phase == Phase::Done {
                return None;
            }
            if self.cancel.is_cancelled() {
                self.abort().await;
                return None;
            }

            if self.phase == Phase::Finishing {
                self.phase = Phase::Done;
                let content = clean_content(&self.raw);
                let plan = parse_action_plan(&content);
                tracing::debug!(
                    session = %self.session,
                    chars = content.len(),
                    has_plan = plan.is_some(),
                    "response complete"
                );
                return Some(Ok(SessionEvent::Completed { content, plan }));
            }

            let polled = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                next = self.chunks.next() => Some(next),
            };
            let Some(next) = polled else {
                self.abort().await;
                return None;
            };

            match next {
                Some(Ok(chunk)) => {
                    let message_type = message_type_from_wire(chunk.response_type);
                    let text = if message_type == ChatMessageType::Text {
                        self.raw.push_str(&chunk.text);
                        let visible = self.filter.push(&chunk.text);
                        if visible.is_empty() {
                            continue;
                        }
                        visible
                    } else {
                        chunk.text
                    };
                    return Some(Ok(SessionEvent::Delta { message_type, text }));
                }
                Some(Err(e)) => {
                    tracing::error!(session = %self.session, error = %e, "response stream failed");
                    self.phase = Phase::Done;
                    return Some(Err(e));
                }
                None => {
                    self.phase = Phase::Finishing;
                    let tail = self.filter.finish();
                    if !tail.is_empty() {
                        return Some(Ok(SessionEvent::Delta {
                            message_type: ChatMessageType::Text,
                            text: tail,
                        }));
                    }
                }
            }
        }
    }

    async fn abort(&mut self) {
        self.phase = Phase::Done;
        tracing::info!(session = %self.session, "response stream cancelled, closing session");
        if let Err(e) = self
            .backend
            .close_session(&self.session, CloseReason::Cancelled)
            .await
        {
            tracing::warn!(session = %self.session, error = %e, "failed to close cancelled session");
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::protocol::WireResponseType;
    use crate::inference::types::BackendChunk;
    use crate::test_support::FakeBackend;

    fn chunks(items: Vec<BackendChunk>) -> ChunkStream {
        stream::iter(items.into_iter().map(Ok)).boxed()
    }

    fn chunk(response_type: WireResponseType, text: &str) -> BackendChunk {
        BackendChunk {
            response_type,
            text: text.into(),
        }
    }

    async fn collect(stream: ResponseStream) -> Vec<SessionEvent> {
        stream
            .map(|item| item.expect("stream item"))
            .collect::<Vec<_>>()
            .await
    }

    #[tokio::test]
    async fn test_forwards_deltas_then_completes() {
        let backend = Arc::new(FakeBackend::new());
        let stream = response_stream(
            backend.clone(),
            SessionHandle::new("s-1"),
            chunks(vec![
                chunk(WireResponseType::Reasoning, "weighing options"),
                BackendChunk::text("<thi"),
                BackendChunk::text("nk>hidden</think>Hel"),
                BackendChunk::text("lo<response>!</response>"),
            ]),
            CancellationToken::new(),
        );

        let events = collect(stream).await;
        let deltas: Vec<(ChatMessageType, &str)> = events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Delta { message_type, text } => Some((*message_type, text.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(deltas[0], (ChatMessageType::Thinking, "weighing options"));
        let visible: String = deltas[1..].iter().map(|(_, t)| *t).collect();
        assert!(!visible.contains("hidden"));
        assert!(visible.starts_with("Hello"));

        assert_eq!(
            events.last(),
            Some(&SessionEvent::Completed {
                content: "Hello!".into(),
                plan: None,
            })
        );
        assert!(backend.closed().is_empty());
    }

    #[tokio::test]
    async fn test_completed_carries_plan() {
        let text = "Sure.\n<plan><goal>Tidy files</goal><step>List</step><step>Move</step></plan>";
        let stream = response_stream(
            Arc::new(FakeBackend::new()),
            SessionHandle::new("s-2"),
            chunks(vec![BackendChunk::text(text)]),
            CancellationToken::new(),
        );

        let events = collect(stream).await;
        match events.last() {
            Some(SessionEvent::Completed { plan: Some(plan), .. }) => {
                assert_eq!(plan.goal, "Tidy files");
                assert_eq!(plan.steps.len(), 2);
            }
            other => panic!("expected completed event with plan, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_response_type_is_text() {
        let stream = response_stream(
            Arc::new(FakeBackend::new()),
            SessionHandle::new("s-3"),
            chunks(vec![chunk(WireResponseType::Unrecognized(42), "odd")]),
            CancellationToken::new(),
        );
        let events = collect(stream).await;
        assert_eq!(
            events[0],
            SessionEvent::Delta {
                message_type: ChatMessageType::Text,
                text: "odd".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_cancel_closes_session_and_ends_stream() {
        let backend = Arc::new(FakeBackend::new());
        let cancel = CancellationToken::new();
        let endless: ChunkStream = stream::iter(vec![Ok(BackendChunk::text("first"))])
            .chain(stream::pending())
            .boxed();

        let mut stream =
            response_stream(backend.clone(), SessionHandle::new("s-4"), endless, cancel.clone());

        let first = stream.next().await.unwrap().unwrap();
        assert!(matches!(first, SessionEvent::Delta { .. }));

        let trigger = cancel.clone();
        tokio::spawn(async move { trigger.cancel() });
        assert!(stream.next().await.is_none());
        assert!(stream.next().await.is_none());

        assert_eq!(
            backend.closed(),
            vec![(SessionHandle::new("s-4"), CloseReason::Cancelled)]
        );
    }

    #[tokio::test]
    async fn test_polling_after_completion_keeps_returning_none() {
        let mut stream = response_stream(
            Arc::new(FakeBackend::new()),
            SessionHandle::new("s-6"),
            chunks(vec![BackendChunk::text("hi")]),
            CancellationToken::new(),
        );

        assert!(matches!(
            stream.next().await,
            Some(Ok(SessionEvent::Delta { .. }))
        ));
        assert!(matches!(
            stream.next().await,
            Some(Ok(SessionEvent::Completed { .. }))
        ));
        for _ in 0..3 {
            assert!(stream.next().await.is_none());
        }
    }

    #[tokio::test]
    async fn test_backend_error_is_yielded_then_ends() {
        let failing: ChunkStream = stream::iter(vec![
            Ok(BackendChunk::text("partial")),
            Err(InferenceError::StreamError {
                reason: "connection reset".into(),
            }),
            Ok(BackendChunk::text("never seen")),
        ])
        .boxed();

        let mut stream = response_stream(
            Arc::new(FakeBackend::new()),
            SessionHandle::new("s-5"),
            failing,
            CancellationToken::new(),
        );

        assert!(stream.next().await.unwrap().is_ok());
        assert!(matches!(
            stream.next().await,
            Some(Err(InferenceError::StreamError { .. }))
        ));
        assert!(stream.next().await.is_none());
    }
}
