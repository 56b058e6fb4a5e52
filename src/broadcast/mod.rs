//! Snapshot fan-out to display clients.
//!
//! A [`MetricsBroadcaster`] ticks on a fixed interval, takes one snapshot per
//! tick and offers it to every subscriber queue. Subscribers that cannot
//! accept it are dropped without affecting the rest.

pub mod broadcaster;
pub mod subscriber;

pub use broadcaster::MetricsBroadcaster;
pub use subscriber::{PublishOutcome, SubscriberId, SubscriberSet, Subscription};
