//! Domain model (ids, lifecycle states, payments, queue tasks, decisions).

pub mod decision;
pub mod errors;
pub mod ids;
pub mod payment;
pub mod state;
pub mod task;

pub use self::decision::Decision;
pub use self::errors::{ErrorKind, ValidationError};
pub use self::ids::{ExternalAccountId, PaymentId, UserId};
pub use self::payment::{NewPayment, Payment};
pub use self::state::{ExternalStatus, PaymentStatus};
pub use self::task::PaymentTask;
