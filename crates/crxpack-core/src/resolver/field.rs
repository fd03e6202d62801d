//! Three-state build fields.

/// A build-request slot.
///
/// `Unset` and `Requested` both hold no value; they differ in whether the
/// engine should derive one.
#[derive(Clone, PartialEq, Eq)]
pub enum Field<T> {
    /// Not mentioned by the caller; computed only if something needs it.
    Unset,
    /// The caller asked for this value to be derived.
    Requested,
    /// A concrete value.
    Given(T),
}

/// Value-less view of a [`Field`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldState {
    /// See [`Field::Unset`].
    Unset,
    /// See [`Field::Requested`].
    Requested,
    /// See [`Field::Given`].
    Given,
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Self::Unset
    }
}

impl<T> Field<T> {
    /// Wrap a concrete value.
    pub fn given(value: T) -> Self {
        Self::Given(value)
    }

    /// The current state.
    pub fn state(&self) -> FieldState {
        match self {
            Self::Unset => FieldState::Unset,
            Self::Requested => FieldState::Requested,
            Self::Given(_) => FieldState::Given,
        }
    }

    /// `true` for [`Field::Unset`].
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// `true` for [`Field::Requested`].
    pub fn is_requested(&self) -> bool {
        matches!(self, Self::Requested)
    }

    /// `true` for [`Field::Given`].
    pub fn is_given(&self) -> bool {
        matches!(self, Self::Given(_))
    }

    /// The concrete value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Given(value) => Some(value),
            _ => None,
        }
    }

    /// Consume the field, returning its concrete value, if any.
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Given(value) => Some(value),
            _ => None,
        }
    }

    /// Promote `Unset` to `Requested`. Returns whether anything changed.
    pub fn request(&mut self) -> bool {
        if self.is_unset() {
            *self = Self::Requested;
            true
        } else {
            false
        }
    }

    /// Store a concrete value, replacing whatever was there.
    pub fn set(&mut self, value: T) {
        *self = Self::Given(value);
    }

    /// Store a concrete value unless one is already present.
    pub fn fill(&mut self, value: T) {
        if !self.is_given() {
            *self = Self::Given(value);
        }
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Unset, Self::Given)
    }
}

impl<T> std::fmt::Debug for Field<T> {
    // Values are elided; some fields hold key material.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.state(), f)
    }
}
