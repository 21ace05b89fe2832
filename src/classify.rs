//! Classification of size-limit rejections.
//!
//! Only a [`TransportError::TooLarge`] rejection counts as "too large". An
//! [`SendError::AdjustmentExhausted`] deliberately does not: once an adjusted
//! payload has been rejected, nothing upstream may try again.

use crate::{
    error::{HandlerError, SendError},
    transport::{SendOutcome, TransportError},
};

/// Types that can carry a transport size rejection.
pub trait Oversize {
    /// Returns `true` if this value is a "payload too large" rejection.
    fn is_too_large(&self) -> bool;
}

impl Oversize for TransportError {
    fn is_too_large(&self) -> bool { matches!(self, Self::TooLarge { .. }) }
}

impl Oversize for SendError {
    fn is_too_large(&self) -> bool { matches!(self, Self::Transport(error) if error.is_too_large()) }
}

impl Oversize for HandlerError {
    fn is_too_large(&self) -> bool { matches!(self, Self::Send(error) if error.is_too_large()) }
}

impl<T, E: Oversize> Oversize for Result<T, E> {
    fn is_too_large(&self) -> bool { self.as_ref().is_err_and(Oversize::is_too_large) }
}

/// Returns `true` if `outcome` is a size-limit rejection.
///
/// # Examples
///
/// ```
/// use oversend::{classify::is_too_large, transport::TransportError};
///
/// assert!(is_too_large(&Err(TransportError::TooLarge { size: 9, limit: 8 })));
/// assert!(!is_too_large(&Err(TransportError::other("unauthorised"))));
/// assert!(!is_too_large(&Ok(())));
/// ```
#[must_use]
pub fn is_too_large(outcome: &SendOutcome) -> bool { outcome.is_too_large() }
