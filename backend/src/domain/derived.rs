//! Values computed from collaborators that may be missing.

/// A derived field whose source may be unavailable.
///
/// Projections keep the distinction explicit; adapters render
/// [`Derived::Unavailable`] as the type's default (zero or null).
///
/// # Examples
/// ```
/// use backend::domain::Derived;
///
/// assert_eq!(Derived::Available(3_u64).or_default(), 3);
/// assert_eq!(Derived::<u64>::Unavailable.or_default(), 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derived<T> {
    Available(T),
    Unavailable,
}

impl<T> Derived<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    pub fn as_ref(&self) -> Derived<&T> {
        match self {
            Self::Available(value) => Derived::Available(value),
            Self::Unavailable => Derived::Unavailable,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Derived<U> {
        match self {
            Self::Available(value) => Derived::Available(f(value)),
            Self::Unavailable => Derived::Unavailable,
        }
    }

    pub fn ok(self) -> Option<T> {
        match self {
            Self::Available(value) => Some(value),
            Self::Unavailable => None,
        }
    }
}

impl<T: Default> Derived<T> {
    pub fn or_default(self) -> T {
        self.ok().unwrap_or_default()
    }
}

impl<T> From<Option<T>> for Derived<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Unavailable, Self::Available)
    }
}
