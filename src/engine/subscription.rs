// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use super::{Engine, TaskEvent, Verdict};
use crate::observability::messages::engine::SubscriptionLagged;
use crate::observability::messages::StructuredLog;
use crate::traits::RequestCallback;

/// Handle that stops one listener. Unsubscribing never affects in-flight tasks.
#[derive(Debug, Clone, Default)]
pub struct Subscription {
    token: CancellationToken,
}

impl Subscription {
    pub(crate) fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    pub fn unsubscribe(&self) {
        self.token.cancel();
    }

    pub fn is_unsubscribed(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }
}

/// Several subscriptions cancelled together.
#[derive(Debug, Clone, Default)]
pub struct CompoundSubscription {
    parts: Vec<Subscription>,
}

impl CompoundSubscription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, subscription: Subscription) -> &mut Self {
        self.parts.push(subscription);
        self
    }

    pub fn unsubscribe(&self) {
        self.parts.iter().for_each(Subscription::unsubscribe);
    }

    pub fn is_unsubscribed(&self) -> bool {
        self.parts.iter().all(Subscription::is_unsubscribed)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// Subscribes one callback to the results of several methods at once.
///
/// ```no_run
/// # use rpc_taskflow::engine::{Engine, Subscriber};
/// # use rpc_taskflow::traits::RequestCallback;
/// # use std::sync::Arc;
/// # fn demo(engine: Engine, callback: Arc<dyn RequestCallback>) {
/// let subscription = Subscriber::new(&engine)
///     .method("user.get")
///     .method("user.list")
///     .subscribe(callback, false);
/// subscription.unsubscribe();
/// # }
/// ```
pub struct Subscriber<'a> {
    engine: &'a Engine,
    methods: Vec<String>,
}

impl<'a> Subscriber<'a> {
    pub fn new(engine: &'a Engine) -> Self {
        Self {
            engine,
            methods: Vec::new(),
        }
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.methods.push(method.into());
        self
    }

    pub fn subscribe(self, callback: Arc<dyn RequestCallback>, once: bool) -> CompoundSubscription {
        let mut compound = CompoundSubscription::new();
        for method in self.methods {
            compound.add(self.engine.subscribe(&method, callback.clone(), once));
        }
        compound
    }
}

/// Stream of future successful results of one method.
pub struct Observer {
    method: String,
    receiver: broadcast::Receiver<TaskEvent>,
    subscription: Subscription,
}

impl Observer {
    pub(crate) fn new(
        method: String,
        receiver: broadcast::Receiver<TaskEvent>,
        subscription: Subscription,
    ) -> Self {
        Self {
            method,
            receiver,
            subscription,
        }
    }

    /// Handle that ends this observer from elsewhere.
    pub fn subscription(&self) -> Subscription {
        self.subscription.clone()
    }

    /// Next successful payload; `None` once unsubscribed or the engine stopped.
    pub async fn next(&mut self) -> Option<Value> {
        loop {
            let event = tokio::select! {
                biased;
                _ = self.subscription.token().cancelled() => return None,
                event = self.receiver.recv() => event,
            };
            match event {
                Ok(TaskEvent {
                    method,
                    verdict: Verdict::Success { payload, .. },
                    ..
                }) if method == self.method => return Some(payload),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    SubscriptionLagged {
                        method: &self.method,
                        skipped,
                    }
                    .log();
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compound_cancels_every_part() {
        let a = Subscription::default();
        let b = Subscription::default();
        let mut compound = CompoundSubscription::new();
        compound.add(a.clone()).add(b.clone());

        assert_eq!(compound.len(), 2);
        assert!(!compound.is_unsubscribed());
        compound.unsubscribe();
        assert!(a.is_unsubscribed());
        assert!(b.is_unsubscribed());
        assert!(compound.is_unsubscribed());
    }
}
