//! 带外（OOB）命令通道：从求值结果中提取命令块，按标签分发给处理器，补充文本并入回复

pub mod alarm;
pub mod command;
pub mod default;
pub mod dial;
pub mod dialog;
pub mod email;
pub mod registry;

pub use alarm::AlarmHandler;
pub use command::{OobCommand, OobElement, OobExtractor};
pub use default::DefaultHandler;
pub use dial::DialHandler;
pub use dialog::DialogHandler;
pub use email::EmailHandler;
pub use registry::{factory_of, handler_factory, HandlerFactory, HandlerRegistry, OobHandler};
