//! Live fan-out of task status events to WebSocket listeners.

mod hub;

pub use hub::{task_channel, NotificationHub, Subscription, RESULTS_CHANNEL};
