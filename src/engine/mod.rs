mod dispatch;
pub mod factory;
mod flow;
mod registry;
mod replay;
mod subscription;
mod task;

pub use flow::{Engine, TaskHandle};
pub(crate) use flow::Command;
pub use factory::EngineBuilder;
pub use registry::TaskRegistry;
pub use replay::{ReplayCursor, ReplayLog};
pub use subscription::{CompoundSubscription, Observer, Subscriber, Subscription};
pub use task::{Promise, Task, TaskEvent, Verdict};
