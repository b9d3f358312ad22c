//! The accessor trait the engine is generic over.

use crate::field::FieldKey;
use crate::value::Value;

/// Trait for records that can be searched, filtered, sorted and placed on the
/// pipeline.
///
/// The engine never looks at a record directly: every read goes through
/// [`field_value`](Seekable::field_value). [`Lead`](crate::Lead) is the
/// production implementation; tests and embedders can implement it for their
/// own row types.
///
/// # Example
///
/// ```
/// use leadgrid_seeker::{FieldKey, Seekable, Value};
///
/// struct Row {
///     company: String,
/// }
///
/// impl Seekable for Row {
///     fn field_value(&self, key: FieldKey) -> Value<'_> {
///         match key {
///             FieldKey::Company => Value::text(Some(self.company.as_str())),
///             _ => Value::Null,
///         }
///     }
/// }
///
/// let row = Row { company: "Acme".into() };
/// assert_eq!(row.field_value(FieldKey::Company).as_str(), Some("Acme"));
/// assert!(row.field_value(FieldKey::Email).is_null());
/// ```
pub trait Seekable {
    /// Returns the value of a field for comparison.
    ///
    /// Fields the record does not carry must return [`Value::Null`]; the
    /// engine treats null as the neutral value everywhere.
    fn field_value(&self, key: FieldKey) -> Value<'_>;
}
