use std::time::Duration;

pub const SETTLE: Duration = Duration::from_millis(50);
pub const ITEMS_LOW: usize = 50;
pub const ITEMS_MEDIUM: usize = 200;
pub const ITEMS_HIGH: usize = 1000;
