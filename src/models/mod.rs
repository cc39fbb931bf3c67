mod drink_option;
mod record;
mod record_id;
mod seat_option;

pub use drink_option::{DrinkOption, DrinkType};
pub use record::{Fields, SyncRecord, ValidationError};
pub use record_id::{RecordId, LOCAL_PREFIX};
pub use seat_option::{available_party_sizes, SeatOption, SeatType};
