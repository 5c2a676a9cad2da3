//! Built-in record schemas.

mod sale;
mod title;

pub use sale::Sale;
pub use title::{PrimaryTitleEquals, Title, primary_title_equals};

/// Overwrites `slot` with `value`, keeping the slot's allocation.
fn assign(slot: &mut String, value: &str) {
    slot.clear();
    slot.push_str(value);
}
