use crate::{ErrorKind, InjectError, InjectResult, Key};

/// Information about an active request.
#[derive(Clone, Debug, Default)]
pub struct RequestInfo {
    key_path: Vec<Key>,
}

impl RequestInfo {
    /// Creates a new, empty instance of [`RequestInfo`].
    #[must_use]
    pub fn new() -> Self {
        RequestInfo::default()
    }

    /// Creates a new child instance of [`RequestInfo`] with the given key
    /// appended to the end of the request path. Fails if the key is already
    /// being provided further up the path.
    pub fn with_request(&self, key: &Key) -> InjectResult<Self> {
        if self.key_path.contains(key) {
            let mut path = self.key_path.clone();
            path.push(key.clone());
            return Err(InjectError::new(ErrorKind::CycleDetected {
                key: key.clone(),
                path,
            }));
        }

        let mut child = self.clone();
        child.key_path.push(key.clone());
        Ok(child)
    }

    /// Gets the current request path, starting with the original request.
    /// This can be used to configure a service based on what it's being
    /// injected into.
    #[must_use]
    pub fn key_path(&self) -> &[Key] {
        &self.key_path
    }

    /// Gets the key currently being provided.
    #[must_use]
    pub fn current(&self) -> Option<&Key> {
        self.key_path.last()
    }
}
