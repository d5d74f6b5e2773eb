//! Circuit breaker guard around publisher calls (§4.5).
//!
//! `failsafe` ships a synchronous breaker (`CircuitBreaker::call`); the
//! outbox's publish calls are async, so each cycle drives the breaker's
//! lower-level `is_call_permitted`/`on_success`/`on_error` API by hand
//! around the awaited call instead. `CircuitBreaker` itself also carries
//! generic `call`/`call_with` methods, so it isn't object-safe and
//! `dyn CircuitBreaker` doesn't compile. [`Gate`] is a local, object-safe
//! facade over just the three non-generic methods this module drives,
//! blanket-implemented for every `CircuitBreaker` so the registry can still
//! hold one boxed breaker per publisher.

use failsafe::{CircuitBreaker, Config};
use std::collections::HashMap;
use std::sync::Mutex;

trait Gate: Send {
    fn is_call_permitted(&self) -> bool;
    fn on_success(&self);
    fn on_error(&self);
}

impl<T: CircuitBreaker + Send> Gate for T {
    fn is_call_permitted(&self) -> bool {
        CircuitBreaker::is_call_permitted(self)
    }

    fn on_success(&self) {
        CircuitBreaker::on_success(self)
    }

    fn on_error(&self) {
        CircuitBreaker::on_error(self)
    }
}

/// One breaker per publisher name, keyed `"outbox-<publisher>"`.
pub struct CircuitRegistry {
    breakers: Mutex<HashMap<String, Box<dyn Gate + Send>>>,
}

impl CircuitRegistry {
    pub fn new() -> Self {
        Self { breakers: Mutex::new(HashMap::new()) }
    }

    fn key(publisher: &str) -> String {
        format!("outbox-{publisher}")
    }

    /// `true` if the breaker for `publisher` currently allows a call.
    pub fn is_call_permitted(&self, publisher: &str) -> bool {
        let mut breakers = self.breakers.lock().expect("circuit registry poisoned");
        breakers.entry(Self::key(publisher)).or_insert_with(new_breaker).is_call_permitted()
    }

    pub fn on_success(&self, publisher: &str) {
        let mut breakers = self.breakers.lock().expect("circuit registry poisoned");
        breakers.entry(Self::key(publisher)).or_insert_with(new_breaker).on_success();
    }

    pub fn on_error(&self, publisher: &str) {
        let mut breakers = self.breakers.lock().expect("circuit registry poisoned");
        breakers.entry(Self::key(publisher)).or_insert_with(new_breaker).on_error();
    }
}

impl Default for CircuitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn new_breaker() -> Box<dyn Gate + Send> {
    Box::new(Config::new().build())
}
