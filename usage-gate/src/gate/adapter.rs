//! Wrapping the gate around unary and streaming handlers.
//!
//! Service implementations call these from their trait methods:
//!
//! ```ignore
//! async fn push_path(
//!     &self,
//!     request: Request<Streaming<PushPathRequest>>,
//! ) -> Result<Response<PushPathResponse>, Status> {
//!     self.gate
//!         .unary(PUSH_PATH, request, |request, call| self.push_path_inner(request, call))
//!         .await
//! }
//! ```

use futures::{Stream, StreamExt};
use std::future::Future;
use std::pin::Pin;
use tonic::{Request, Response, Status};
use tracing::Instrument;

use service_core::grpc::record_request_metadata;

use super::UsageGate;
use crate::context::CallContext;

/// Response stream of a server-streaming call with the post-call hook
/// appended.
pub type MeteredStream<T> = Pin<Box<dyn Stream<Item = Result<T, Status>> + Send>>;

impl UsageGate {
    /// Run `handler` between the pre-call and post-call hooks.
    ///
    /// Use for unary and client-streaming methods, where the handler has
    /// consumed its input by the time it returns. The handler receives the
    /// call context alongside the request; it is also in the request
    /// extensions.
    pub async fn unary<Req, Res, F, Fut>(
        &self,
        method: &str,
        request: Request<Req>,
        handler: F,
    ) -> Result<Response<Res>, Status>
    where
        F: FnOnce(Request<Req>, CallContext) -> Fut,
        Fut: Future<Output = Result<Response<Res>, Status>>,
    {
        let span = tracing::info_span!(
            "usage_gate.call",
            method = %method,
            request_id = tracing::field::Empty
        );
        async move {
            let (request, ctx) = self.enter(method, request).await?;
            let response = handler(request, ctx.clone()).await?;
            self.post_call(&ctx).await?;
            Ok::<_, Status>(response)
        }
        .instrument(span)
        .await
    }

    /// Run a server-streaming or bidirectional `handler` under the gate.
    ///
    /// The pre-call hook runs before the handler. The post-call hook runs once
    /// the returned stream has yielded its last item; its error, if any,
    /// becomes the final item. A stream that ends with an error, or is
    /// dropped early, is never committed.
    pub async fn server_streaming<Req, T, S, F, Fut>(
        &self,
        method: &str,
        request: Request<Req>,
        handler: F,
    ) -> Result<Response<MeteredStream<T>>, Status>
    where
        F: FnOnce(Request<Req>, CallContext) -> Fut,
        Fut: Future<Output = Result<Response<S>, Status>>,
        S: Stream<Item = Result<T, Status>> + Send + 'static,
        T: Send + 'static,
    {
        let span = tracing::info_span!(
            "usage_gate.call",
            method = %method,
            request_id = tracing::field::Empty
        );
        async move {
            let (request, ctx) = self.enter(method, request).await?;
            let response = handler(request, ctx.clone()).await?;
            let (metadata, stream, extensions) = response.into_parts();
            let metered = metered_stream(self.clone(), ctx, stream);
            Ok::<_, Status>(Response::from_parts(metadata, metered, extensions))
        }
        .instrument(span)
        .await
    }

    async fn enter<Req>(
        &self,
        method: &str,
        mut request: Request<Req>,
    ) -> Result<(Request<Req>, CallContext), Status> {
        record_request_metadata(request.metadata());
        let ctx = self
            .pre_call(CallContext::from_request(method, &request))
            .await?;
        ctx.attach(&mut request);
        Ok((request, ctx))
    }
}

enum StreamState<S> {
    Streaming {
        stream: Pin<Box<S>>,
        gate: UsageGate,
        ctx: CallContext,
    },
    Done,
}

fn metered_stream<T, S>(gate: UsageGate, ctx: CallContext, stream: S) -> MeteredStream<T>
where
    S: Stream<Item = Result<T, Status>> + Send + 'static,
    T: Send + 'static,
{
    let initial = StreamState::Streaming {
        stream: Box::pin(stream),
        gate,
        ctx,
    };

    Box::pin(futures::stream::unfold(initial, |state| async move {
        let StreamState::Streaming {
            mut stream,
            gate,
            ctx,
        } = state
        else {
            return None;
        };

        match stream.next().await {
            Some(Ok(item)) => Some((Ok(item), StreamState::Streaming { stream, gate, ctx })),
            Some(Err(status)) => Some((Err(status), StreamState::Done)),
            None => match gate.post_call(&ctx).await {
                Ok(()) => None,
                Err(e) => Some((Err(e.into()), StreamState::Done)),
            },
        }
    }))
}
