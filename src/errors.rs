use std::{any::Any, fmt};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum RegistryError {
    #[error("pool name {0} is already registered")]
    Duplicate(String),
}

/// Паника, пойманная воркером при выполнении задачи
pub struct PanicPayload(Box<dyn Any + Send + 'static>);

impl PanicPayload {
    pub fn new(payload: Box<dyn Any + Send + 'static>) -> Self {
        Self(payload)
    }

    /// Текст паники, если она была вызвана через `panic!` со строкой
    pub fn message(&self) -> Option<&str> {
        if let Some(s) = self.0.downcast_ref::<&'static str>() {
            Some(*s)
        } else {
            self.0.downcast_ref::<String>().map(String::as_str)
        }
    }

    #[inline]
    pub fn as_any(&self) -> &(dyn Any + Send) {
        &*self.0
    }

    pub fn into_inner(self) -> Box<dyn Any + Send + 'static> {
        self.0
    }
}

impl fmt::Debug for PanicPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PanicPayload").field(&self.to_string()).finish()
    }
}

impl fmt::Display for PanicPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message().unwrap_or("Box<dyn Any>"))
    }
}
