mod payable;

pub use payable::{PayableReference, PayableReferenceError};
