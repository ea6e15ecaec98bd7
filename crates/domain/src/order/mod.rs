//! Orders: status transitions, guarded mutations and owner-checked reads.

mod order_no;
mod queries;
mod shipping;
mod state_machine;
mod transition;

pub use order_no::{OrderNoGenerator, RandomOrderNo};
pub use queries::{OrderDetails, OrderQueries};
pub use shipping::validate_shipping;
pub use state_machine::{OrderStateMachine, TransitionOutcome};
pub use transition::Transition;
