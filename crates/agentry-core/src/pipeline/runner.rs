//! Pipeline Runner
//!
//! Threads a payload through the handlers of a hook, then into an optional
//! destination.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;

use super::payload::HookPayload;
use super::registry::{HandlerSlot, PipelineRegistry};

/// Middleware-style hook handler.
///
/// Call `next.run(payload)` to continue the chain; returning without calling it
/// halts the chain and makes the returned payload the pipeline result.
#[async_trait]
pub trait HookHandler: Send + Sync {
    async fn handle(&self, payload: HookPayload, next: Next) -> HookPayload;
}

/// Terminal step that runs after the last handler
pub type Destination = Box<dyn FnOnce(HookPayload) -> BoxFuture<'static, HookPayload> + Send>;

/// Wrap an async closure as a [`Destination`]
pub fn destination<F, Fut>(f: F) -> Destination
where
    F: FnOnce(HookPayload) -> Fut + Send + 'static,
    Fut: Future<Output = HookPayload> + Send + 'static,
{
    Box::new(move |payload| f(payload).boxed())
}

/// The remainder of a handler chain
pub struct Next {
    handlers: Arc<Vec<HandlerSlot>>,
    index: usize,
    destination: Option<Destination>,
}

impl Next {
    fn new(handlers: Arc<Vec<HandlerSlot>>, destination: Option<Destination>) -> Self {
        Self {
            handlers,
            index: 0,
            destination,
        }
    }

    /// Continue with the next handler, or the destination once handlers run out
    pub fn run(self, payload: HookPayload) -> BoxFuture<'static, HookPayload> {
        async move {
            let Next {
                handlers,
                index,
                destination,
            } = self;

            match handlers.get(index).map(HandlerSlot::resolve) {
                Some(handler) => {
                    let next = Next {
                        handlers,
                        index: index + 1,
                        destination,
                    };
                    handler.handle(payload, next).await
                }
                None => match destination {
                    Some(destination) => destination(payload).await,
                    None => payload,
                },
            }
        }
        .boxed()
    }

    /// Handlers still to run after this point
    pub fn remaining(&self) -> usize {
        self.handlers.len().saturating_sub(self.index)
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.remaining())
            .field("destination", &self.destination.is_some())
            .finish()
    }
}

/// Handler backed by an async closure
pub struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> HookHandler for FnHandler<F>
where
    F: Fn(HookPayload, Next) -> Fut + Send + Sync,
    Fut: Future<Output = HookPayload> + Send + 'static,
{
    async fn handle(&self, payload: HookPayload, next: Next) -> HookPayload {
        (self.f)(payload, next).await
    }
}

/// Register a closure as a hook handler
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn HookHandler>
where
    F: Fn(HookPayload, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HookPayload> + Send + 'static,
{
    Arc::new(FnHandler { f })
}

/// Executes hook pipelines against a shared registry
#[derive(Clone, Debug, Default)]
pub struct PipelineRunner {
    registry: Arc<PipelineRegistry>,
}

impl PipelineRunner {
    pub fn new(registry: Arc<PipelineRegistry>) -> Self {
        Self { registry }
    }

    /// Runner over the built-in hooks with no handlers
    pub fn empty() -> Self {
        Self::new(Arc::new(PipelineRegistry::with_default_hooks()))
    }

    pub fn registry(&self) -> &PipelineRegistry {
        &self.registry
    }

    /// Run every handler of `name`, ignoring the active flag.
    ///
    /// Without handlers the result is `destination(payload)`, or `payload`
    /// itself when there is no destination.
    pub async fn run(&self, name: &str, payload: HookPayload, destination: Option<Destination>) -> HookPayload {
        let handlers = self
            .registry
            .get(name)
            .map(|hook| Arc::clone(&hook.handlers))
            .unwrap_or_default();

        if !handlers.is_empty() {
            tracing::debug!(hook = %name, handlers = handlers.len(), payload = payload.kind(), "Running hook pipeline");
        }

        Next::new(handlers, destination).run(payload).await
    }

    /// Like [`run`](Self::run), but a missing or deactivated hook behaves as
    /// one without handlers
    pub async fn run_if_active(
        &self,
        name: &str,
        payload: HookPayload,
        destination: Option<Destination>,
    ) -> HookPayload {
        if self.registry.is_active(name) {
            self.run(name, payload, destination).await
        } else {
            Next::new(Arc::default(), destination).run(payload).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const HOOK: &str = "custom.test";

    fn custom(value: Value) -> HookPayload {
        HookPayload::Custom(value)
    }

    fn value_of(payload: HookPayload) -> Value {
        payload.into_custom().unwrap()
    }

    /// Appends `tag` to the payload's `trail` array
    fn tagging(tag: &'static str) -> Arc<dyn HookHandler> {
        handler_fn(move |payload: HookPayload, next: Next| async move {
            let mut value = value_of(payload);
            value["trail"].as_array_mut().unwrap().push(json!(tag));
            next.run(custom(value)).await
        })
    }

    fn counting(counter: Arc<AtomicUsize>, forward: bool) -> Arc<dyn HookHandler> {
        handler_fn(move |payload: HookPayload, next: Next| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if forward {
                    next.run(payload).await
                } else {
                    custom(json!("halted"))
                }
            }
        })
    }

    #[tokio::test]
    async fn test_handlers_run_in_registration_order() {
        let mut registry = PipelineRegistry::new();
        registry.register(HOOK, tagging("first")).register(HOOK, tagging("second"));
        let runner = PipelineRunner::new(Arc::new(registry));

        let out = runner.run(HOOK, custom(json!({ "trail": [] })), None).await;
        assert_eq!(value_of(out)["trail"], json!(["first", "second"]));
    }

    #[tokio::test]
    async fn test_handler_without_next_halts_chain() {
        let before = Arc::new(AtomicUsize::new(0));
        let after = Arc::new(AtomicUsize::new(0));
        let reached = Arc::new(AtomicUsize::new(0));

        let mut registry = PipelineRegistry::new();
        registry
            .register(HOOK, counting(Arc::clone(&before), true))
            .register(HOOK, counting(Arc::new(AtomicUsize::new(0)), false))
            .register(HOOK, counting(Arc::clone(&after), true));
        let runner = PipelineRunner::new(Arc::new(registry));

        let reached_in_destination = Arc::clone(&reached);
        let out = runner
            .run(
                HOOK,
                custom(json!("input")),
                Some(destination(move |payload| async move {
                    reached_in_destination.fetch_add(1, Ordering::SeqCst);
                    payload
                })),
            )
            .await;

        assert_eq!(value_of(out), json!("halted"));
        assert_eq!(before.load(Ordering::SeqCst), 1);
        assert_eq!(after.load(Ordering::SeqCst), 0);
        assert_eq!(reached.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unregistered_hook_passes_through() {
        let runner = PipelineRunner::empty();

        let out = runner.run("nobody.listens", custom(json!(7)), None).await;
        assert_eq!(value_of(out), json!(7));

        let out = runner
            .run(
                "nobody.listens",
                custom(json!(7)),
                Some(destination(|payload| async move {
                    let n = value_of(payload).as_i64().unwrap();
                    custom(json!(n * 6))
                })),
            )
            .await;
        assert_eq!(value_of(out), json!(42));
    }

    #[tokio::test]
    async fn test_destination_sees_handler_output() {
        let mut registry = PipelineRegistry::new();
        registry.register(HOOK, tagging("handler"));
        let runner = PipelineRunner::new(Arc::new(registry));

        let out = runner
            .run(
                HOOK,
                custom(json!({ "trail": [] })),
                Some(destination(|payload| async move {
                    let mut value = value_of(payload);
                    value["trail"].as_array_mut().unwrap().push(json!("destination"));
                    custom(value)
                })),
            )
            .await;
        assert_eq!(value_of(out)["trail"], json!(["handler", "destination"]));
    }

    #[tokio::test]
    async fn test_deactivated_hook_is_skipped_by_run_if_active() {
        let mut registry = PipelineRegistry::new();
        registry.register(HOOK, tagging("handler"));
        registry.deactivate(HOOK).unwrap();
        let runner = PipelineRunner::new(Arc::new(registry));

        let skipped = runner.run_if_active(HOOK, custom(json!({ "trail": [] })), None).await;
        assert_eq!(value_of(skipped)["trail"], json!([]));

        let forced = runner.run(HOOK, custom(json!({ "trail": [] })), None).await;
        assert_eq!(value_of(forced)["trail"], json!(["handler"]));
    }

    #[tokio::test]
    async fn test_lazy_handler_is_built_per_run() {
        let built = Arc::new(AtomicUsize::new(0));
        let built_in_factory = Arc::clone(&built);

        let mut registry = PipelineRegistry::new();
        registry.register_lazy(HOOK, move || {
            built_in_factory.fetch_add(1, Ordering::SeqCst);
            tagging("lazy")
        });
        let runner = PipelineRunner::new(Arc::new(registry));
        assert_eq!(built.load(Ordering::SeqCst), 0);

        runner.run(HOOK, custom(json!({ "trail": [] })), None).await;
        runner.run(HOOK, custom(json!({ "trail": [] })), None).await;
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }
}
