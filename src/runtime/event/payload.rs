use std::{
    any::{type_name, Any},
    fmt::Debug,
};

///
/// The opaque data attached to an event.
///
/// The kernel never inspects payloads. Receivers recover the concrete
/// type with [`Payload::downcast_ref`] or [`Payload::take`].
///
pub struct Payload {
    inner: Option<Box<dyn Any>>,
    ty_info: &'static str,
}

impl Payload {
    /// An empty payload.
    #[must_use]
    pub fn none() -> Self {
        Self {
            inner: None,
            ty_info: "()",
        }
    }

    /// Wraps a value of any type.
    #[must_use]
    pub fn new<T: 'static>(val: T) -> Self {
        Self {
            inner: Some(Box::new(val)),
            ty_info: type_name::<T>(),
        }
    }

    /// Whether no data is attached.
    #[must_use]
    pub fn is_none(&self) -> bool {
        self.inner.is_none()
    }

    /// The type name of the attached data.
    #[must_use]
    pub fn ty(&self) -> &'static str {
        self.ty_info
    }

    /// Whether the attached data is of type `T`.
    #[must_use]
    pub fn is<T: 'static>(&self) -> bool {
        self.inner.as_ref().is_some_and(|v| v.is::<T>())
    }

    /// Borrows the attached data as `T`.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.inner.as_ref()?.downcast_ref::<T>()
    }

    ///
    /// Takes the attached data as `T`.
    ///
    /// # Errors
    ///
    /// Returns the unchanged payload if it does not contain a `T`.
    ///
    pub fn take<T: 'static>(self) -> Result<T, Payload> {
        let Payload { inner, ty_info } = self;
        match inner {
            Some(inner) => match inner.downcast::<T>() {
                Ok(val) => Ok(*val),
                Err(inner) => Err(Payload {
                    inner: Some(inner),
                    ty_info,
                }),
            },
            None => Err(Payload { inner: None, ty_info }),
        }
    }
}

impl Default for Payload {
    fn default() -> Self {
        Self::none()
    }
}

impl From<()> for Payload {
    fn from((): ()) -> Self {
        Self::none()
    }
}

impl Debug for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Payload<{}>", self.ty_info)
    }
}
