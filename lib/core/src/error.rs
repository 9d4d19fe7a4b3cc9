//! Error handling foundation for paperbridge.
//!
//! Only the `Result` alias lives here. Each crate defines its own error enums
//! in its `error` module and wraps them in a rootcause `Report` when an error
//! crosses a layer boundary.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_alias_holds_values() {
        let ok: Result<u32> = Ok(7);
        assert_eq!(ok.expect("should be ok"), 7);
    }
}
