//! Scripted in-memory oracles for tests.
//!
//! Answers come from a queue (consumed in call order) first, then from a
//! per-query table, then from a fallback. Every call is recorded so tests can
//! assert exactly which queries reached the "service".

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use postcheck_core::Postcode;

use crate::error::LookupError;
use crate::traits::{LookupOracle, SecondaryDirectory};

/// Shared scripting logic for both in-memory services.
struct Script<T> {
    queue: Mutex<VecDeque<Result<T, LookupError>>>,
    table: HashMap<String, Result<T, LookupError>>,
    fallback: Result<T, LookupError>,
    calls: Mutex<Vec<String>>,
}

impl<T: Clone> Script<T> {
    fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            table: HashMap::new(),
            fallback: Err(LookupError::NoData),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn answer(&self, query: &str) -> Result<T, LookupError> {
        self.calls
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(query.to_string());

        let queued = self
            .queue
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front();
        match queued {
            Some(answer) => answer,
            None => self
                .table
                .get(query)
                .cloned()
                .unwrap_or_else(|| self.fallback.clone()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

/// In-memory [`LookupOracle`].
pub struct MemoryOracle {
    script: Script<Postcode>,
}

impl MemoryOracle {
    /// Oracle that answers "no data" to everything.
    pub fn new() -> Self {
        Self {
            script: Script::new(),
        }
    }

    /// Answer every unscripted address with `answer`.
    pub fn with_fallback(mut self, answer: Result<Postcode, LookupError>) -> Self {
        self.script.fallback = answer;
        self
    }

    /// Answer `address` with `answer`.
    pub fn with_answer(
        mut self,
        address: impl Into<String>,
        answer: Result<Postcode, LookupError>,
    ) -> Self {
        self.script.table.insert(address.into(), answer);
        self
    }

    /// Answer the next calls, in order, with `answers`, whatever the address.
    pub fn with_sequence(self, answers: impl IntoIterator<Item = Result<Postcode, LookupError>>) -> Self {
        self.script
            .queue
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .extend(answers);
        self
    }

    /// Addresses resolved so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.script.calls()
    }

    pub fn call_count(&self) -> usize {
        self.script.calls().len()
    }
}

impl Default for MemoryOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LookupOracle for MemoryOracle {
    async fn resolve(&self, address: &str) -> Result<Postcode, LookupError> {
        self.script.answer(address)
    }
}

/// In-memory [`SecondaryDirectory`].
pub struct MemoryPostOffices {
    script: Script<String>,
}

impl MemoryPostOffices {
    /// Directory that knows no post offices.
    pub fn new() -> Self {
        Self {
            script: Script::new(),
        }
    }

    pub fn with_office(mut self, postcode: &Postcode, address: impl Into<String>) -> Self {
        self.script
            .table
            .insert(postcode.to_string(), Ok(address.into()));
        self
    }

    pub fn with_failure(mut self, postcode: &Postcode, error: LookupError) -> Self {
        self.script.table.insert(postcode.to_string(), Err(error));
        self
    }

    /// Postcodes queried so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.script.calls()
    }
}

impl Default for MemoryPostOffices {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecondaryDirectory for MemoryPostOffices {
    async fn representative_address(&self, postcode: &Postcode) -> Result<String, LookupError> {
        self.script.answer(postcode.as_str())
    }
}
