//! The `Unsealable` envelope and its combinators.
//!
//! A value derived from a confidential output is either available in
//! plaintext or not yet decryptable (no active permit, missing key, pending
//! call). Downstream arithmetic goes through [`process_unsealables`], which
//! short-circuits to [`Unsealable::Sealed`] without running the combiner when
//! any input is missing.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::sealed::Unsealed;
use crate::types::{Address, U256};

/// Either a decrypted value or the "not decryptable right now" marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Unsealable<T> {
    #[default]
    Sealed,
    Unsealed(T),
}

impl<T> Unsealable<T> {
    /// Wrap an available plaintext.
    pub fn unsealed(value: T) -> Self {
        Self::Unsealed(value)
    }

    pub fn is_unsealed(&self) -> bool {
        matches!(self, Self::Unsealed(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Unsealed(v) => Some(v),
            Self::Sealed => None,
        }
    }

    pub fn as_ref(&self) -> Unsealable<&T> {
        match self {
            Self::Unsealed(v) => Unsealable::Unsealed(v),
            Self::Sealed => Unsealable::Sealed,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Unsealable<U> {
        match self {
            Self::Unsealed(v) => Unsealable::Unsealed(f(v)),
            Self::Sealed => Unsealable::Sealed,
        }
    }

    pub fn and_then<U>(self, f: impl FnOnce(T) -> Unsealable<U>) -> Unsealable<U> {
        match self {
            Self::Unsealed(v) => f(v),
            Self::Sealed => Unsealable::Sealed,
        }
    }

    /// The plaintext, or `fallback` when still sealed.
    pub fn unwrap_or(self, fallback: T) -> T {
        self.into_option().unwrap_or(fallback)
    }
}

impl<T> From<Option<T>> for Unsealable<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Unsealed(v),
            None => Self::Sealed,
        }
    }
}

/// The plaintext of `value`, or `fallback` when it is still sealed.
pub fn unsealable_or<T>(value: Unsealable<T>, fallback: T) -> T {
    value.unwrap_or(fallback)
}

/// Wire shape: `{"unsealed": true, "data": T}` or `{"unsealed": false}`.
#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    unsealed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

impl<T: Serialize> Serialize for Unsealable<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let envelope = match self {
            Self::Unsealed(v) => Envelope {
                unsealed: true,
                data: Some(v),
            },
            Self::Sealed => Envelope {
                unsealed: false,
                data: None,
            },
        };
        envelope.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Unsealable<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let envelope = Envelope::<T>::deserialize(deserializer)?;
        match (envelope.unsealed, envelope.data) {
            (true, Some(v)) => Ok(Self::Unsealed(v)),
            (true, None) => Err(de::Error::missing_field("data")),
            (false, _) => Ok(Self::Sealed),
        }
    }
}

/// One input to [`process_unsealables`].
///
/// Raw values are always available, `Unsealable`s only when unsealed, and
/// `Option`s only when present.
pub trait UnsealInput {
    type Output;

    fn into_unsealed(self) -> Option<Self::Output>;
}

impl<T> UnsealInput for Unsealable<T> {
    type Output = T;

    fn into_unsealed(self) -> Option<T> {
        self.into_option()
    }
}

impl<T: Clone> UnsealInput for &Unsealable<T> {
    type Output = T;

    fn into_unsealed(self) -> Option<T> {
        self.as_ref().into_option().cloned()
    }
}

impl<T: UnsealInput> UnsealInput for Option<T> {
    type Output = T::Output;

    fn into_unsealed(self) -> Option<T::Output> {
        self.and_then(UnsealInput::into_unsealed)
    }
}

/// A raw value of any type, always available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plain<T>(pub T);

impl<T> UnsealInput for Plain<T> {
    type Output = T;

    fn into_unsealed(self) -> Option<T> {
        Some(self.0)
    }
}

macro_rules! impl_plain_input {
    ($($ty:ty),* $(,)?) => {
        $(
            impl UnsealInput for $ty {
                type Output = $ty;

                fn into_unsealed(self) -> Option<$ty> {
                    Some(self)
                }
            }
        )*
    };
}

impl_plain_input!(bool, u8, u16, u32, u64, u128, usize, i32, i64, i128, String, U256, Address, Unsealed);

/// A fixed-arity group of inputs (a tuple of [`UnsealInput`]s).
pub trait UnsealInputs {
    type Output;

    fn into_unsealed(self) -> Option<Self::Output>;
}

macro_rules! impl_unseal_inputs {
    ($($name:ident),*) => {
        impl<$($name: UnsealInput),*> UnsealInputs for ($($name,)*) {
            type Output = ($($name::Output,)*);

            #[allow(non_snake_case)]
            fn into_unsealed(self) -> Option<Self::Output> {
                let ($($name,)*) = self;
                Some(($($name.into_unsealed()?,)*))
            }
        }
    };
}

impl_unseal_inputs!();
impl_unseal_inputs!(A);
impl_unseal_inputs!(A, B);
impl_unseal_inputs!(A, B, C);
impl_unseal_inputs!(A, B, C, D);
impl_unseal_inputs!(A, B, C, D, E);
impl_unseal_inputs!(A, B, C, D, E, F);

/// Combine several possibly-sealed inputs.
///
/// If any input is missing or sealed the result is [`Unsealable::Sealed`] and
/// `combine` is not called. Otherwise the unwrapped inputs are passed to
/// `combine` and its return value is wrapped as unsealed.
pub fn process_unsealables<I, R>(inputs: I, combine: impl FnOnce(I::Output) -> R) -> Unsealable<R>
where
    I: UnsealInputs,
{
    match inputs.into_unsealed() {
        Some(values) => Unsealable::Unsealed(combine(values)),
        None => Unsealable::Sealed,
    }
}

/// Variable-length form of [`process_unsealables`] over homogeneous inputs.
pub fn process_unsealable_list<I, R>(
    inputs: impl IntoIterator<Item = I>,
    combine: impl FnOnce(Vec<I::Output>) -> R,
) -> Unsealable<R>
where
    I: UnsealInput,
{
    let values: Option<Vec<_>> = inputs.into_iter().map(UnsealInput::into_unsealed).collect();
    match values {
        Some(values) => Unsealable::Unsealed(combine(values)),
        None => Unsealable::Sealed,
    }
}
