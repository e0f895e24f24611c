// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;

use crate::engine::Subscription;
use crate::traits::HeaderListener;

struct Registration {
    method: String,
    /// Empty accepts every header.
    names: HashSet<String>,
    listener: Arc<dyn HeaderListener>,
    token: CancellationToken,
}

impl Registration {
    fn accepts(&self, method: &str, name: &str) -> bool {
        self.method == method && (self.names.is_empty() || self.names.contains(name))
    }
}

/// Method-scoped registry of response-header listeners.
///
/// Clones share the same registry. Header names are matched exactly as the transport
/// reports them.
#[derive(Clone, Default)]
pub struct HeaderObserver {
    registrations: Arc<RwLock<Vec<Registration>>>,
}

impl HeaderObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` for responses of `method`, limited to `names` (empty = all).
    pub fn register<I, S>(&self, method: &str, listener: Arc<dyn HeaderListener>, names: I) -> Subscription
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let token = CancellationToken::new();
        let registration = Registration {
            method: method.to_string(),
            names: names.into_iter().map(Into::into).collect(),
            listener,
            token: token.clone(),
        };
        let mut registrations = self.registrations.write().unwrap_or_else(|e| e.into_inner());
        registrations.retain(|r| !r.token.is_cancelled());
        registrations.push(registration);
        Subscription::new(token)
    }

    /// Hands every header of a response for `method` to the interested listeners.
    ///
    /// Listeners run after the registry lock is released, so they may register or
    /// unsubscribe from inside `on_new_header`. Cancelled registrations are pruned here.
    pub fn propagate(&self, method: &str, headers: &HashMap<String, String>) {
        let mut deliveries = Vec::new();
        let mut has_cancelled = false;
        {
            let registrations = self.registrations.read().unwrap_or_else(|e| e.into_inner());
            for registration in registrations.iter() {
                if registration.token.is_cancelled() {
                    has_cancelled = true;
                    continue;
                }
                for (name, value) in headers {
                    if registration.accepts(method, name) {
                        deliveries.push((registration.listener.clone(), name, value));
                    }
                }
            }
        }

        if has_cancelled {
            self.prune();
        }
        for (listener, name, value) in deliveries {
            listener.on_new_header(method, name, value);
        }
    }

    fn prune(&self) {
        self.registrations
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|r| !r.token.is_cancelled());
    }

    /// Registrations held in the registry, cancelled ones included until the next prune.
    #[cfg(test)]
    fn stored(&self) -> usize {
        self.registrations.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn len(&self) -> usize {
        self.registrations
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|r| !r.token.is_cancelled())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for HeaderObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeaderObserver")
            .field("registrations", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collect(Mutex<Vec<(String, String, String)>>);

    impl HeaderListener for Collect {
        fn on_new_header(&self, method: &str, name: &str, value: &str) {
            self.0
                .lock()
                .unwrap()
                .push((method.into(), name.into(), value.into()));
        }
    }

    fn headers() -> HashMap<String, String> {
        HashMap::from([
            ("x-token".to_string(), "t1".to_string()),
            ("x-trace".to_string(), "abc".to_string()),
        ])
    }

    #[test]
    fn filters_by_method_and_name() {
        let observer = HeaderObserver::new();
        let token_only = Arc::new(Collect::default());
        let everything = Arc::new(Collect::default());
        observer.register("auth.login", token_only.clone(), ["x-token"]);
        observer.register("auth.login", everything.clone(), Vec::<String>::new());

        observer.propagate("auth.login", &headers());
        observer.propagate("user.get", &headers());

        assert_eq!(
            *token_only.0.lock().unwrap(),
            vec![("auth.login".into(), "x-token".into(), "t1".into())]
        );
        assert_eq!(everything.0.lock().unwrap().len(), 2);
    }

    #[test]
    fn unsubscribed_listener_receives_nothing() {
        let observer = HeaderObserver::new();
        let listener = Arc::new(Collect::default());
        let subscription = observer.register("auth.login", listener.clone(), ["x-token"]);
        assert_eq!(observer.len(), 1);

        subscription.unsubscribe();
        observer.propagate("auth.login", &headers());
        assert!(listener.0.lock().unwrap().is_empty());
        assert!(observer.is_empty());
    }

    #[test]
    fn propagate_prunes_cancelled_registrations() {
        let observer = HeaderObserver::new();
        let kept = Arc::new(Collect::default());
        let dropped = observer.register("auth.login", Arc::new(Collect::default()), ["x-token"]);
        observer.register("auth.login", kept.clone(), ["x-token"]);
        dropped.unsubscribe();
        assert_eq!(observer.stored(), 2);

        observer.propagate("auth.login", &headers());
        assert_eq!(observer.stored(), 1);
        assert_eq!(kept.0.lock().unwrap().len(), 1);
    }

    /// Registers a follow-up listener the first time it hears a header.
    struct Chained {
        observer: HeaderObserver,
        follow_up: Arc<Collect>,
        seen: Mutex<usize>,
    }

    impl HeaderListener for Chained {
        fn on_new_header(&self, method: &str, _name: &str, _value: &str) {
            let mut seen = self.seen.lock().unwrap();
            if *seen == 0 {
                self.observer
                    .register(method, self.follow_up.clone(), ["x-token"]);
            }
            *seen += 1;
        }
    }

    #[test]
    fn listener_can_register_from_inside_a_callback() {
        let observer = HeaderObserver::new();
        let follow_up = Arc::new(Collect::default());
        let chained = Arc::new(Chained {
            observer: observer.clone(),
            follow_up: follow_up.clone(),
            seen: Mutex::new(0),
        });
        observer.register("auth.login", chained.clone(), ["x-token"]);

        observer.propagate("auth.login", &headers());
        assert_eq!(observer.len(), 2);
        assert!(follow_up.0.lock().unwrap().is_empty());

        observer.propagate("auth.login", &headers());
        assert_eq!(*chained.seen.lock().unwrap(), 2);
        assert_eq!(follow_up.0.lock().unwrap().len(), 1);
    }
}
