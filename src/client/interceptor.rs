//! Ordered request/response interceptor chain (§4.6), replacing the
//! teacher's bean-injected collaborators (Design Notes: "replace with a
//! builder that accepts ordered slices of interceptor/listener values").

use async_trait::async_trait;

/// What an interceptor's `before` stage decides: let the call proceed, or
/// short-circuit with a synthetic response without reaching transport.
pub enum InterceptorOutcome<Resp> {
    Continue,
    ShortCircuit(Resp),
}

/// A pluggable stage in the outbound call pipeline that can observe,
/// mutate, or short-circuit a call (§GLOSSARY).
#[async_trait]
pub trait Interceptor<Req, Resp>: Send + Sync {
    /// Stable ordering key; lower runs first. Defaults to 0.
    fn order(&self) -> i32 {
        0
    }

    async fn before(&self, request: &mut Req) -> InterceptorOutcome<Resp>;

    async fn after(&self, _response: &mut Resp) {}
}

/// Runs interceptors in stable `order` and implements short-circuiting.
pub struct InterceptorChain<Req, Resp> {
    interceptors: Vec<Box<dyn Interceptor<Req, Resp>>>,
}

impl<Req, Resp> InterceptorChain<Req, Resp> {
    pub fn new(mut interceptors: Vec<Box<dyn Interceptor<Req, Resp>>>) -> Self {
        interceptors.sort_by_key(|interceptor| interceptor.order());
        Self { interceptors }
    }

    pub fn empty() -> Self {
        Self { interceptors: Vec::new() }
    }

    /// Runs every interceptor's `before` stage in order; returns
    /// `Some(response)` the instant one short-circuits.
    pub async fn before(&self, request: &mut Req) -> Option<Resp> {
        for interceptor in &self.interceptors {
            if let InterceptorOutcome::ShortCircuit(response) = interceptor.before(request).await {
                return Some(response);
            }
        }
        None
    }

    pub async fn after(&self, response: &mut Resp) {
        for interceptor in &self.interceptors {
            interceptor.after(response).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    struct OrderRecorder {
        order: i32,
        log: Arc<std::sync::Mutex<Vec<i32>>>,
    }

    #[async_trait]
    impl Interceptor<String, String> for OrderRecorder {
        fn order(&self) -> i32 {
            self.order
        }

        async fn before(&self, _request: &mut String) -> InterceptorOutcome<String> {
            self.log.lock().unwrap().push(self.order);
            InterceptorOutcome::Continue
        }
    }

    #[tokio::test]
    async fn runs_interceptors_in_stable_order() {
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));
        let chain = InterceptorChain::new(vec![
            Box::new(OrderRecorder { order: 10, log: log.clone() }),
            Box::new(OrderRecorder { order: -5, log: log.clone() }),
            Box::new(OrderRecorder { order: 0, log: log.clone() }),
        ]);

        let mut request = "request".to_string();
        assert!(chain.before(&mut request).await.is_none());
        assert_eq!(*log.lock().unwrap(), vec![-5, 0, 10]);
    }

    struct ShortCircuiter;

    #[async_trait]
    impl Interceptor<String, String> for ShortCircuiter {
        async fn before(&self, _request: &mut String) -> InterceptorOutcome<String> {
            InterceptorOutcome::ShortCircuit("cached".to_string())
        }
    }

    struct Unreachable {
        called: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Interceptor<String, String> for Unreachable {
        fn order(&self) -> i32 {
            100
        }

        async fn before(&self, _request: &mut String) -> InterceptorOutcome<String> {
            self.called.fetch_add(1, Ordering::SeqCst);
            InterceptorOutcome::Continue
        }
    }

    #[tokio::test]
    async fn short_circuit_skips_later_interceptors() {
        let called = Arc::new(AtomicU32::new(0));
        let chain = InterceptorChain::new(vec![Box::new(ShortCircuiter), Box::new(Unreachable { called: called.clone() })]);

        let mut request = "request".to_string();
        let response = chain.before(&mut request).await;
        assert_eq!(response, Some("cached".to_string()));
        assert_eq!(called.load(Ordering::SeqCst), 0);
    }
}
