//! Declarative per-operation schema tables.
//!
//! Each logical operation is described by an [`OperationPolicy`]: its delivery
//! mode, its schema variants ordered newest first, and whether an unsupported
//! newest shape is a hard error or silently falls back to an older shape.
//! Variant shapes are plain functions from the call arguments and the
//! variant's version to a primitive [`ArgumentMap`].

use crate::{ArgumentMap, DeliveryMode, OperationName, RpcError, RpcVersion};

/// Builds the argument mapping for one schema variant.
pub type ShapeFn<A> = fn(&A, RpcVersion) -> Result<ArgumentMap, RpcError>;

/// What happens when the remote endpoint cannot accept the newer variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// The oldest variant is the baseline shape and is always sendable; newer
    /// variants are used only when negotiated.
    SoftFallback,
    /// The operation has no shape older than its oldest variant; if that
    /// variant is not supported the call fails with
    /// [`RpcError::ServiceTooOld`] before anything is sent.
    Hard,
}

// ---------------------------------------------------------------------------

/// One wire shape of an operation.
pub struct SchemaVariant<A> {
    /// Oldest remote version that understands this shape. Also the version
    /// stamped on the envelope.
    pub min_version: RpcVersion,
    /// Wire method name for this shape; may differ between variants.
    pub method: OperationName,
    /// Argument builder.
    pub shape: ShapeFn<A>,
}

impl<A> SchemaVariant<A> {
    /// Creates a variant.
    pub fn new(min_version: RpcVersion, method: &'static str, shape: ShapeFn<A>) -> Self {
        Self {
            min_version,
            method: OperationName::from_static(method),
            shape,
        }
    }
}

impl<A> std::fmt::Debug for SchemaVariant<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaVariant")
            .field("min_version", &self.min_version)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------

/// The full wire policy of one logical operation.
///
/// Always holds at least one variant; variants are strictly ordered from
/// newest to oldest.
#[derive(Debug)]
pub struct OperationPolicy<A> {
    name: OperationName,
    mode: DeliveryMode,
    gate: Gate,
    variants: Vec<SchemaVariant<A>>,
}

impl<A> OperationPolicy<A> {
    /// Creates a soft-fallback policy whose newest shape is `newest`.
    pub fn new(name: &'static str, mode: DeliveryMode, newest: SchemaVariant<A>) -> Self {
        Self {
            name: OperationName::from_static(name),
            mode,
            gate: Gate::SoftFallback,
            variants: vec![newest],
        }
    }

    /// Fire-and-forget to one endpoint.
    pub fn cast(name: &'static str, newest: SchemaVariant<A>) -> Self {
        Self::new(name, DeliveryMode::Cast, newest)
    }

    /// Request/reply.
    pub fn call(name: &'static str, newest: SchemaVariant<A>) -> Self {
        Self::new(name, DeliveryMode::Call, newest)
    }

    /// Fire-and-forget broadcast to every endpoint on the topic.
    pub fn fanout_cast(name: &'static str, newest: SchemaVariant<A>) -> Self {
        Self::new(name, DeliveryMode::FanoutCast, newest)
    }

    /// Appends an older shape, tried after every shape already registered.
    pub fn falls_back_to(mut self, older: SchemaVariant<A>) -> Self {
        debug_assert!(
            self.oldest().min_version > older.min_version,
            "schema variants of {} must be registered newest first",
            self.name
        );
        self.variants.push(older);
        self
    }

    /// Marks the operation as hard-gated on its oldest variant.
    pub fn hard_gated(mut self) -> Self {
        self.gate = Gate::Hard;
        self
    }

    /// Logical operation name (used in errors and logs).
    pub fn name(&self) -> &OperationName {
        &self.name
    }

    /// Delivery mode.
    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    /// Gate policy.
    pub fn gate(&self) -> Gate {
        self.gate
    }

    /// Variants, newest first.
    pub fn variants(&self) -> &[SchemaVariant<A>] {
        &self.variants
    }

    /// The newest variant.
    pub fn newest(&self) -> &SchemaVariant<A> {
        &self.variants[0]
    }

    /// The oldest (baseline) variant.
    pub fn oldest(&self) -> &SchemaVariant<A> {
        &self.variants[self.variants.len() - 1]
    }
}
