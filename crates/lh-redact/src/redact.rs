//! The [`Redact`] capability and the [`Sensitive`] wrapper.
//!
//! Every value the redactor can walk implements [`Redact`]. Container impls
//! recurse; a type with its own redacted representation implements the trait
//! directly and the redactor uses whatever it returns without looking inside.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::Redactor;

/// A value that can be rendered in redacted form.
pub trait Redact {
    /// Produce the redacted representation of `self`.
    fn redact_with(&self, redactor: &Redactor) -> Value;
}

impl<T: Redact + ?Sized> Redact for &T {
    fn redact_with(&self, redactor: &Redactor) -> Value {
        (**self).redact_with(redactor)
    }
}

impl<T: Redact + ?Sized> Redact for Box<T> {
    fn redact_with(&self, redactor: &Redactor) -> Value {
        (**self).redact_with(redactor)
    }
}

impl Redact for Value {
    fn redact_with(&self, redactor: &Redactor) -> Value {
        redactor.redact_json(self)
    }
}

impl Redact for Map<String, Value> {
    fn redact_with(&self, redactor: &Redactor) -> Value {
        Value::Object(redactor.redact_map(self))
    }
}

impl Redact for str {
    fn redact_with(&self, redactor: &Redactor) -> Value {
        Value::String(redactor.redact_text(self))
    }
}

impl Redact for String {
    fn redact_with(&self, redactor: &Redactor) -> Value {
        self.as_str().redact_with(redactor)
    }
}

macro_rules! passthrough {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Redact for $ty {
                fn redact_with(&self, _redactor: &Redactor) -> Value {
                    Value::from(*self)
                }
            }
        )*
    };
}

passthrough!(bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, isize, usize);

impl Redact for () {
    fn redact_with(&self, _redactor: &Redactor) -> Value {
        Value::Null
    }
}

impl<T: Redact> Redact for Option<T> {
    fn redact_with(&self, redactor: &Redactor) -> Value {
        match self {
            Some(value) => value.redact_with(redactor),
            None => Value::Null,
        }
    }
}

impl<T: Redact> Redact for [T] {
    fn redact_with(&self, redactor: &Redactor) -> Value {
        Value::Array(self.iter().map(|v| v.redact_with(redactor)).collect())
    }
}

impl<T: Redact, const N: usize> Redact for [T; N] {
    fn redact_with(&self, redactor: &Redactor) -> Value {
        self.as_slice().redact_with(redactor)
    }
}

impl<T: Redact> Redact for Vec<T> {
    fn redact_with(&self, redactor: &Redactor) -> Value {
        self.as_slice().redact_with(redactor)
    }
}

impl<T: Redact> Redact for VecDeque<T> {
    fn redact_with(&self, redactor: &Redactor) -> Value {
        Value::Array(self.iter().map(|v| v.redact_with(redactor)).collect())
    }
}

fn redact_entries<'a, K, V, I>(entries: I, redactor: &Redactor) -> Value
where
    K: AsRef<str> + 'a,
    V: Redact + 'a,
    I: Iterator<Item = (&'a K, &'a V)>,
{
    let map = entries
        .map(|(key, value)| {
            let key = key.as_ref();
            let redacted = if redactor.is_sensitive_key(key) {
                redactor.token_value()
            } else {
                value.redact_with(redactor)
            };
            (key.to_string(), redacted)
        })
        .collect();
    Value::Object(map)
}

impl<K: AsRef<str>, V: Redact, S> Redact for HashMap<K, V, S> {
    fn redact_with(&self, redactor: &Redactor) -> Value {
        redact_entries(self.iter(), redactor)
    }
}

impl<K: AsRef<str>, V: Redact> Redact for BTreeMap<K, V> {
    fn redact_with(&self, redactor: &Redactor) -> Value {
        redact_entries(self.iter(), redactor)
    }
}

// Tuples keep their arity and element order as a JSON array.
macro_rules! tuple_impl {
    ($($name:ident . $idx:tt),+) => {
        impl<$($name: Redact),+> Redact for ($($name,)+) {
            fn redact_with(&self, redactor: &Redactor) -> Value {
                Value::Array(vec![$(self.$idx.redact_with(redactor)),+])
            }
        }
    };
}

tuple_impl!(A.0);
tuple_impl!(A.0, B.1);
tuple_impl!(A.0, B.1, C.2);
tuple_impl!(A.0, B.1, C.2, D.3);

/// Wraps a value that must never appear in logs.
///
/// The redactor replaces it with its token. Outside the redactor,
/// `Debug`, `Display` and `Serialize` all print [`DEFAULT_REDACTION_TOKEN`](crate::DEFAULT_REDACTION_TOKEN).
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Sensitive<T>(T);

impl<T> Sensitive<T> {
    pub fn new(value: T) -> Self {
        Sensitive(value)
    }

    /// Borrow the wrapped value.
    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> From<T> for Sensitive<T> {
    fn from(value: T) -> Self {
        Sensitive(value)
    }
}

impl<T> Redact for Sensitive<T> {
    fn redact_with(&self, redactor: &Redactor) -> Value {
        redactor.token_value()
    }
}

impl<T> fmt::Debug for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(crate::DEFAULT_REDACTION_TOKEN)
    }
}

impl<T> fmt::Display for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(crate::DEFAULT_REDACTION_TOKEN)
    }
}

impl<T> Serialize for Sensitive<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(crate::DEFAULT_REDACTION_TOKEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Card {
        number: String,
    }

    impl Redact for Card {
        fn redact_with(&self, _redactor: &Redactor) -> Value {
            let last4 = &self.number[self.number.len() - 4..];
            json!(format!("card ending {last4}"))
        }
    }

    #[test]
    fn test_custom_representation_is_used_verbatim() {
        // The pattern would match the custom output, but it is not recursed into.
        let redactor = Redactor::new(Vec::<String>::new(), &[r"\d{4}"], "<redacted>").unwrap();
        let card = Card {
            number: "4111111111111111".to_string(),
        };

        assert_eq!(redactor.redact(&card), json!("card ending 1111"));
        assert_eq!(redactor.redact(&vec![card]), json!(["card ending 1111"]));
    }

    #[test]
    fn test_sensitive_wrapper() {
        let redactor = Redactor::default();
        let secret = Sensitive::new("hunter2".to_string());

        assert_eq!(redactor.redact(&secret), json!("<redacted>"));
        assert_eq!(format!("{secret:?}"), "<redacted>");
        assert_eq!(secret.to_string(), "<redacted>");
        assert_eq!(serde_json::to_string(&secret).unwrap(), "\"<redacted>\"");
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn test_sensitive_uses_configured_token() {
        let mut redactor = Redactor::default();
        redactor.set_redaction_token("***");
        assert_eq!(redactor.redact(&Sensitive::new(1)), json!("***"));
    }

    #[test]
    fn test_hash_map_keys_checked() {
        let redactor = Redactor::with_keys(["password"]);
        let mut map = HashMap::new();
        map.insert("password".to_string(), "secret".to_string());
        map.insert("user".to_string(), "alice".to_string());

        assert_eq!(
            redactor.redact(&map),
            json!({"password": "<redacted>", "user": "alice"})
        );
    }

    #[test]
    fn test_tuple_keeps_arity_and_order() {
        let redactor = Redactor::new(Vec::<String>::new(), &["x"], "_").unwrap();
        let tuple = ("axa".to_string(), 7u32, Some("x"));

        assert_eq!(redactor.redact(&tuple), json!(["a_a", 7, "_"]));
    }

    #[test]
    fn test_option_none_is_null() {
        let redactor = Redactor::default();
        let value: Option<String> = None;
        assert_eq!(redactor.redact(&value), Value::Null);
    }

    #[test]
    fn test_nested_btree_map() {
        let redactor = Redactor::with_keys(["token"]);
        let mut inner = BTreeMap::new();
        inner.insert("Token", vec!["a", "b"]);
        let mut outer = BTreeMap::new();
        outer.insert("auth", inner);

        assert_eq!(redactor.redact(&outer), json!({"auth": {"Token": "<redacted>"}}));
    }
}
