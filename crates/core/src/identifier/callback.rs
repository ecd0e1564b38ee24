use async_trait::async_trait;

use super::{Credentials, Identification, Identifier};
use crate::identity::Record;

type Callback = dyn Fn(&Credentials) -> Result<Option<Record>, Vec<String>> + Send + Sync;

/// Delegates identification to a closure.
///
/// Returning `Err(errors)` from the closure fails identification and
/// reports the messages in [`Identification::errors`].
pub struct CallbackIdentifier {
    callback: Box<Callback>,
}

impl CallbackIdentifier {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&Credentials) -> Result<Option<Record>, Vec<String>> + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }
}

#[async_trait]
impl Identifier for CallbackIdentifier {
    async fn identify(&self, credentials: &Credentials) -> Identification {
        match (self.callback)(credentials) {
            Ok(identity) => identity.into(),
            Err(errors) => Identification::failed(errors),
        }
    }

    fn name(&self) -> &str {
        "callback"
    }
}
