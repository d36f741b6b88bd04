pub mod op;
mod sats;
mod secret;

pub use sats::{Sats, SatsConversionError, SAT_CURRENCY_CODE, SAT_CURRENCY_CODE_LOWER};
pub use secret::Secret;
