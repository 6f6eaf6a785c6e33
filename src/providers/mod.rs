pub mod coveralls;
pub mod github;
pub mod gitlab;

/// Outcome of a fetch that depends on a credential the environment may not
/// provide.
///
/// Distinguishes "no data because the capability is unauthenticated" from
/// "no data because nothing matched". Callers log the unavailable case and
/// degrade to an empty dataset instead of failing the pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability<T> {
    Available(T),
    Unavailable,
}

impl<T> Capability<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Available(value) => Some(value),
            Self::Unavailable => None,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }
}

impl<T: Default> Capability<T> {
    pub fn unwrap_or_default(self) -> T {
        self.into_option().unwrap_or_default()
    }
}
