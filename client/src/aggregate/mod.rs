//! Fan-out/fan-in loading of independent data sources.
//!
//! [`AggregationLoader::load_all`] polls every [`FetchSpec`] concurrently on
//! the calling task and returns once all of them have settled. One outcome is
//! recorded per fetch, in input order, whatever order they finish in. Payloads
//! that do not have the expected shape are replaced by an empty default and a
//! warning instead of failing the entry.

use futures_util::future::{BoxFuture, FutureExt, join_all};
use serde_json::Value;
use std::future::Future;
use std::time::Instant;

use protocol::{CodecError, expect_record, expect_sequence};

use crate::error::{ClientError, FailureKind, Result};
use crate::gateway::Payload;

/// Shape the caller expects from a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// A JSON object, possibly enveloped. Default: `null`.
    Record,
    /// A JSON array, possibly enveloped. Default: `[]`.
    List,
    /// Passed through untouched (images, free-form JSON). Default: `null`.
    Opaque,
}

impl PayloadShape {
    fn empty(self) -> Payload {
        match self {
            PayloadShape::List => Payload::Json(Value::Array(Vec::new())),
            PayloadShape::Record | PayloadShape::Opaque => Payload::Json(Value::Null),
        }
    }
}

/// A named fetch. The operation is a future that is not polled until
/// [`AggregationLoader::load_all`] runs.
pub struct FetchSpec<'a> {
    name: String,
    shape: PayloadShape,
    operation: BoxFuture<'a, Result<Payload>>,
}

impl<'a> FetchSpec<'a> {
    pub fn new<F>(name: impl Into<String>, shape: PayloadShape, operation: F) -> Self
    where
        F: Future<Output = Result<Payload>> + Send + 'a,
    {
        Self {
            name: name.into(),
            shape,
            operation: operation.boxed(),
        }
    }

    pub fn record<F>(name: impl Into<String>, operation: F) -> Self
    where
        F: Future<Output = Result<Payload>> + Send + 'a,
    {
        Self::new(name, PayloadShape::Record, operation)
    }

    pub fn list<F>(name: impl Into<String>, operation: F) -> Self
    where
        F: Future<Output = Result<Payload>> + Send + 'a,
    {
        Self::new(name, PayloadShape::List, operation)
    }

    pub fn opaque<F>(name: impl Into<String>, operation: F) -> Self
    where
        F: Future<Output = Result<Payload>> + Send + 'a,
    {
        Self::new(name, PayloadShape::Opaque, operation)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> PayloadShape {
        self.shape
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub name: String,
    pub kind: FailureKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Loaded(Payload),
    Failed(FetchFailure),
}

impl FetchOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, FetchOutcome::Loaded(_))
    }

    pub fn payload(&self) -> Option<&Payload> {
        match self {
            FetchOutcome::Loaded(payload) => Some(payload),
            FetchOutcome::Failed(_) => None,
        }
    }

    pub fn json(&self) -> Option<&Value> {
        self.payload().and_then(Payload::as_json)
    }

    pub fn failure(&self) -> Option<&FetchFailure> {
        match self {
            FetchOutcome::Loaded(_) => None,
            FetchOutcome::Failed(failure) => Some(failure),
        }
    }
}

/// A source whose payload was replaced by its empty default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateWarning {
    pub name: String,
    pub reason: String,
}

/// One outcome per requested name, in request order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateResult {
    entries: Vec<(String, FetchOutcome)>,
    warnings: Vec<AggregateWarning>,
}

impl AggregateResult {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&FetchOutcome> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, outcome)| outcome)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &FetchOutcome)> {
        self.entries
            .iter()
            .map(|(name, outcome)| (name.as_str(), outcome))
    }

    pub fn failures(&self) -> impl Iterator<Item = &FetchFailure> {
        self.entries.iter().filter_map(|(_, outcome)| outcome.failure())
    }

    pub fn warnings(&self) -> &[AggregateWarning] {
        &self.warnings
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    pub fn into_parts(self) -> (Vec<(String, FetchOutcome)>, Vec<AggregateWarning>) {
        (self.entries, self.warnings)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AggregationLoader;

impl AggregationLoader {
    pub fn new() -> Self {
        Self
    }

    /// Runs every fetch to completion and collects the outcomes. Never fails as
    /// a whole.
    pub async fn load_all(&self, specs: Vec<FetchSpec<'_>>) -> AggregateResult {
        let started = Instant::now();
        let mut meta = Vec::with_capacity(specs.len());
        let mut operations = Vec::with_capacity(specs.len());

        for spec in specs {
            if meta.iter().any(|(name, _): &(String, PayloadShape)| *name == spec.name) {
                log::warn!("Duplicate aggregation source '{}'", spec.name);
            }
            meta.push((spec.name, spec.shape));
            operations.push(spec.operation);
        }

        let settled = join_all(operations).await;

        let mut result = AggregateResult {
            entries: Vec::with_capacity(meta.len()),
            warnings: Vec::new(),
        };

        for ((name, shape), outcome) in meta.into_iter().zip(settled) {
            let outcome = match outcome {
                Ok(payload) => match conform(shape, payload) {
                    Ok(payload) => FetchOutcome::Loaded(payload),
                    Err(err) => {
                        result.warnings.push(absorb(&name, &err));
                        FetchOutcome::Loaded(shape.empty())
                    }
                },
                Err(ClientError::MalformedPayload(err)) => {
                    result.warnings.push(absorb(&name, &err));
                    FetchOutcome::Loaded(shape.empty())
                }
                Err(err) => {
                    log::warn!("{} failed to load: {} ({})", name, err.kind(), err);
                    FetchOutcome::Failed(FetchFailure {
                        name: name.clone(),
                        kind: err.kind(),
                        message: err.user_message(),
                    })
                }
            };
            result.entries.push((name, outcome));
        }

        log::debug!(
            "Aggregated {} sources in {:?} ({} failed, {} malformed)",
            result.len(),
            started.elapsed(),
            result.failures().count(),
            result.warnings.len()
        );

        result
    }
}

fn conform(shape: PayloadShape, payload: Payload) -> std::result::Result<Payload, CodecError> {
    match (shape, payload) {
        (PayloadShape::Opaque, payload) => Ok(payload),
        (PayloadShape::List, Payload::Json(value)) => {
            expect_sequence(value).map(|items| Payload::Json(Value::Array(items)))
        }
        (PayloadShape::Record, Payload::Json(value)) => expect_record(value).map(Payload::Json),
        (PayloadShape::List, Payload::Binary { .. }) => {
            Err(CodecError::NotASequence { found: "binary" })
        }
        (PayloadShape::Record, Payload::Binary { .. }) => {
            Err(CodecError::NotARecord { found: "binary" })
        }
    }
}

fn absorb(name: &str, err: &CodecError) -> AggregateWarning {
    log::warn!("{} returned a malformed payload, using empty default: {}", name, err);
    AggregateWarning {
        name: name.to_string(),
        reason: err.to_string(),
    }
}
