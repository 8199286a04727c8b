//! Macros for reducing wire-message boilerplate.

/// Define wire payload types with the derives every payload needs.
///
/// Each struct gets `#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]`;
/// any further attributes (serde renames, skips) are passed through unchanged.
///
/// # Example
///
/// ```rust
/// use vessel_core::wire_messages;
///
/// wire_messages! {
///     /// A probe reading.
///     #[serde(rename_all = "PascalCase")]
///     pub struct Probe {
///         /// Observed value.
///         pub value: f64,
///     }
/// }
///
/// let json = serde_json::to_string(&Probe { value: 1.5 }).expect("serialize");
/// assert_eq!(json, r#"{"Value":1.5}"#);
/// ```
#[macro_export]
macro_rules! wire_messages {
    (
        $(
            $(#[$meta:meta])*
            $vis:vis struct $name:ident {
                $(
                    $(#[$field_meta:meta])*
                    $field_vis:vis $field:ident : $ty:ty
                ),* $(,)?
            }
        )*
    ) => {
        $(
            #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
            $(#[$meta])*
            $vis struct $name {
                $(
                    $(#[$field_meta])*
                    $field_vis $field : $ty,
                )*
            }
        )*
    };
}
