pub mod snapshot;
pub mod summary;

pub use snapshot::NotificationSnapshot;
pub use summary::Summary;
