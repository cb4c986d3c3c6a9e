//! RabbitMQ 消息发布

pub mod cmd;
pub mod sink;

pub use cmd::CmdRabbitmqPublishParams;
pub use sink::{AmqpSink, LapinSink, PublishRequest};
