//! Call envelopes and the primitive codec.
//!
//! An [`Envelope`] is built fresh for every invocation, is immutable once
//! built, and is moved into the transport. Arguments are held as primitive
//! [`serde_json::Value`] trees keyed in a [`BTreeMap`], so two envelopes built
//! from the same inputs serialise byte-for-byte identically.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::{DeliveryMode, OperationName, RpcError, RpcVersion};

/// Argument name → primitive value.
pub type ArgumentMap = BTreeMap<String, Value>;

/// Converts a domain value to its primitive wire representation.
///
/// This is the only codec the RPC layer uses: anything that implements
/// [`Serialize`] can cross the bus.
pub fn to_primitive<T: Serialize + ?Sized>(value: &T) -> Result<Value, serde_json::Error> {
    serde_json::to_value(value)
}

// ---------------------------------------------------------------------------

/// A fully-shaped message ready to hand to a [`crate::Transport`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    method: OperationName,
    version: RpcVersion,
    mode: DeliveryMode,
    args: ArgumentMap,
}

impl Envelope {
    /// Creates an envelope.
    pub fn new(
        method: OperationName,
        version: RpcVersion,
        mode: DeliveryMode,
        args: ArgumentMap,
    ) -> Self {
        Self {
            method,
            version,
            mode,
            args,
        }
    }

    /// Wire method name the remote endpoint dispatches on.
    pub fn method(&self) -> &OperationName {
        &self.method
    }

    /// Version the message shape belongs to.
    pub fn version(&self) -> RpcVersion {
        self.version
    }

    /// Delivery mode the envelope was built for.
    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    /// Primitive arguments.
    pub fn args(&self) -> &ArgumentMap {
        &self.args
    }

    /// Returns a single argument by name.
    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.args.get(name)
    }
}

// ---------------------------------------------------------------------------

/// Builds an [`ArgumentMap`], normalising every value through [`to_primitive`].
///
/// Codec failures are attributed to the operation being shaped.
#[derive(Debug)]
pub struct ArgsBuilder {
    operation: OperationName,
    args: ArgumentMap,
}

impl ArgsBuilder {
    /// Starts an empty argument map for `operation`.
    pub fn new(operation: &OperationName) -> Self {
        Self {
            operation: operation.clone(),
            args: ArgumentMap::new(),
        }
    }

    /// Starts an empty argument map for a static wire method name.
    pub fn for_method(method: &'static str) -> Self {
        Self::new(&OperationName::from_static(method))
    }

    /// Adds `name`, converting `value` to its primitive form.
    pub fn arg<T: Serialize + ?Sized>(mut self, name: &str, value: &T) -> Result<Self, RpcError> {
        let primitive = to_primitive(value).map_err(|source| RpcError::Encode {
            operation: self.operation.clone(),
            source,
        })?;
        self.args.insert(name.to_string(), primitive);
        Ok(self)
    }

    /// Finishes the map.
    pub fn build(self) -> ArgumentMap {
        self.args
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;

    #[test]
    fn test_builder_normalises_values_to_primitives() {
        let op = OperationName::from_static("retype");
        let args = ArgsBuilder::new(&op)
            .arg("volume", &json!({"id": "v1"}))
            .unwrap()
            .arg("filter_properties", &Option::<HashMap<String, u32>>::None)
            .unwrap()
            .arg("size", &10u32)
            .unwrap()
            .build();
        assert_eq!(args["volume"], json!({"id": "v1"}));
        assert_eq!(args["filter_properties"], Value::Null);
        assert_eq!(args["size"], json!(10));
    }

    #[test]
    fn test_builder_reports_codec_failures_against_the_operation() {
        // Maps with non-string keys have no JSON representation.
        let mut bad = HashMap::new();
        bad.insert(vec![1u8], 1u8);
        let op = OperationName::from_static("create_volume");
        let err = ArgsBuilder::new(&op).arg("bad", &bad).unwrap_err();
        match err {
            RpcError::Encode { operation, .. } => assert_eq!(operation, op),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_envelope_serialisation_is_stable() {
        let build = || {
            let op = OperationName::from_static("get_pools");
            let args = ArgsBuilder::new(&op)
                .arg("z", &1)
                .unwrap()
                .arg("a", &2)
                .unwrap()
                .build();
            Envelope::new(op, RpcVersion::new(3, 0), DeliveryMode::Call, args)
        };
        let first = serde_json::to_vec(&build()).unwrap();
        let second = serde_json::to_vec(&build()).unwrap();
        assert_eq!(first, second);
    }
}
