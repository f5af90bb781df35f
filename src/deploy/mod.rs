mod notify;
mod pull_requests;
mod resolver;
mod template;

pub use notify::{Dispatcher, NotificationOutcome, NotifyAction};
pub use pull_requests::aggregate;
pub use resolver::DeployResolver;
