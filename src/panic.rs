//! Formatting of panic payloads caught around processing cycles.

use std::{any::Any, fmt};

/// Displays a caught panic payload.
///
/// `String` and `&'static str` payloads print their text; anything else
/// falls back to `Debug` formatting.
///
/// ```
/// use oversend::panic::format_panic;
///
/// assert_eq!(format_panic(&"boom").to_string(), "boom");
/// assert_eq!(format_panic(&String::from("boom")).to_string(), "boom");
/// ```
#[derive(Debug)]
#[must_use]
pub struct PanicMessage<'a>(&'a (dyn Any + Send));

impl fmt::Display for PanicMessage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = self.0.downcast_ref::<String>() {
            f.write_str(text)
        } else if let Some(text) = self.0.downcast_ref::<&'static str>() {
            f.write_str(text)
        } else {
            write!(f, "{:?}", self.0)
        }
    }
}

/// Borrow a panic payload for display in logs.
///
/// Pass the payload itself (`&*boxed`), not a reference to its box.
pub fn format_panic(panic: &(dyn Any + Send)) -> PanicMessage<'_> { PanicMessage(panic) }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_payloads_print_their_text() {
        let payload: Box<dyn Any + Send> = Box::new(String::from("cycle exploded"));
        assert_eq!(format_panic(&*payload).to_string(), "cycle exploded");
    }

    #[test]
    fn other_payloads_fall_back_to_debug() {
        let payload: Box<dyn Any + Send> = Box::new(5_u32);
        assert!(format_panic(&*payload).to_string().contains("Any"));
    }
}
