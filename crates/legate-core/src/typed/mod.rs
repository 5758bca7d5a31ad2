//! Typed structured-output API.
//!
//! A spec can ask for its result as a concrete Rust type instead of an
//! untyped JSON mapping. The type declares itself via [`Structured`]; the
//! spec stores a type-erased [`DynDecoder`] so `TaskSpec` itself stays
//! non-generic. [`TypedDecoder`] bridges the two: it tries to construct `T`
//! from the decoded JSON value and erases the result into a
//! [`StructuredValue`].

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

use crate::domain::output::StructuredValue;

/// A type that can be requested as a task's structured output.
///
/// # Example
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct Forecast {
///     city: String,
///     outlook: String,
/// }
///
/// impl Structured for Forecast {
///     const NAME: &'static str = "forecast";
/// }
/// ```
///
/// # Trait bounds
/// - `Serialize`: outputs may be re-serialized for callers
/// - `DeserializeOwned`: constructed from the decoded JSON value
/// - `Send + Sync + 'static`: stored type-erased behind `Arc`
pub trait Structured: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Short name used in logs and `Debug` output.
    const NAME: &'static str;
}

/// Object-safe decoder for one structured type.
///
/// Returns `None` when the value cannot construct the type; the reconciler
/// then falls back to the untyped mapping (the documented downgrade path).
pub trait DynDecoder: Send + Sync {
    fn decode_value(&self, value: serde_json::Value) -> Option<StructuredValue>;
    fn type_name(&self) -> &'static str;
}

/// [`DynDecoder`] implementation for a concrete [`Structured`] type.
pub struct TypedDecoder<T: Structured> {
    _marker: PhantomData<T>,
}

impl<T: Structured> TypedDecoder<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T: Structured> Default for TypedDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Structured> DynDecoder for TypedDecoder<T> {
    fn decode_value(&self, value: serde_json::Value) -> Option<StructuredValue> {
        serde_json::from_value::<T>(value)
            .ok()
            .map(|typed| StructuredValue::new(typed, T::NAME))
    }

    fn type_name(&self) -> &'static str {
        T::NAME
    }
}
