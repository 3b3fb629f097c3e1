use std::any::TypeId;
use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;

use crate::context::Object;
use crate::error::TypeError;
use crate::object::ObjectId;

/// An object encoded for storage, tagged with the exact type it was sealed
/// from.
///
/// A `Sealed` can only be produced from a live object, and can only be
/// restored as that same type. There is no way to turn caller-supplied bytes
/// into an object, so a type without a public constructor (a key, a lock, an
/// escrow record) cannot be forged by going through its stored form.
pub struct Sealed {
    id: ObjectId,
    type_id: TypeId,
    type_name: &'static str,
    wrapped: Vec<ObjectId>,
    bytes: Vec<u8>,
}

impl Sealed {
    /// Encode `object` together with its type and the ids it wraps.
    pub fn seal<T: Object>(object: &T) -> Result<Self, TypeError> {
        let bytes =
            bincode::serialize(object).map_err(|e| TypeError::Serialization(e.to_string()))?;
        Ok(Self {
            id: object.id(),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            wrapped: object.wrapped_ids(),
            bytes,
        })
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Returns `true` if this was sealed from a `T`.
    pub fn is<T: Object>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Rust name of the sealed type.
    ///
    /// For diagnostics only: type names are not guaranteed to be unique, so
    /// type checks go through [`is`](Self::is).
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Ids of every object stored inside this one, at any depth.
    pub fn wrapped_ids(&self) -> &[ObjectId] {
        &self.wrapped
    }

    /// Encoded size in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Rebuild the object as a `T`.
    pub fn restore<T: Object>(&self) -> Result<T, TypeError> {
        if !self.is::<T>() {
            return Err(TypeError::WrongType {
                expected: std::any::type_name::<T>(),
                actual: self.type_name,
            });
        }
        T::restore(Image {
            bytes: &self.bytes,
            _type: PhantomData,
        })
    }
}

impl fmt::Debug for Sealed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sealed")
            .field("id", &self.id)
            .field("type", &self.type_name)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// The encoded fields of a sealed `T`, handed to [`Object::restore`].
///
/// Only [`Sealed::restore`] creates images, and only after checking that the
/// bytes were sealed from a `T`.
pub struct Image<'a, T> {
    bytes: &'a [u8],
    _type: PhantomData<fn() -> T>,
}

impl<T> Image<'_, T> {
    /// Decode the image into `R`, the serde form of `T`'s fields.
    pub fn decode<R: DeserializeOwned>(self) -> Result<R, TypeError> {
        bincode::deserialize(self.bytes).map_err(|e| TypeError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Shell {
        id: ObjectId,
        colour: String,
    }

    impl Object for Shell {
        fn id(&self) -> ObjectId {
            self.id
        }

        fn restore(image: Image<'_, Self>) -> Result<Self, TypeError> {
            image.decode()
        }
    }

    // Same fields as `Shell`, so the encodings are interchangeable.
    #[derive(Debug, Serialize, Deserialize)]
    struct Lookalike {
        id: ObjectId,
        colour: String,
    }

    impl Object for Lookalike {
        fn id(&self) -> ObjectId {
            self.id
        }

        fn restore(image: Image<'_, Self>) -> Result<Self, TypeError> {
            image.decode()
        }
    }

    fn shell(colour: &str) -> Shell {
        Shell {
            id: ObjectId::from_hash([5; 32]),
            colour: colour.into(),
        }
    }

    #[test]
    fn restore_returns_an_equal_value() {
        let original = shell("pink");
        let sealed = Sealed::seal(&original).unwrap();
        assert_eq!(sealed.id(), original.id);
        assert_eq!(sealed.restore::<Shell>().unwrap(), original);
    }

    #[test]
    fn restore_refuses_a_different_type_with_the_same_layout() {
        let sealed = Sealed::seal(&Lookalike {
            id: ObjectId::from_hash([5; 32]),
            colour: "pink".into(),
        })
        .unwrap();

        assert!(sealed.is::<Lookalike>());
        assert!(!sealed.is::<Shell>());
        let err = sealed.restore::<Shell>().unwrap_err();
        assert!(matches!(err, TypeError::WrongType { .. }));
    }

    #[test]
    fn plain_objects_wrap_nothing() {
        let sealed = Sealed::seal(&shell("white")).unwrap();
        assert!(sealed.wrapped_ids().is_empty());
        assert!(sealed.size() > 32);
        assert!(sealed.type_name().ends_with("Shell"));
    }
}
