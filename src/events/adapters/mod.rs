pub mod channel;
pub mod in_process;
pub mod noop;

pub use channel::{ChannelAdapter, EnvelopeSink};
pub use in_process::InProcessAdapter;
pub use noop::NoopAdapter;
