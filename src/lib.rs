//! mqtt broker 的订阅模型库
//!
//! 维护 client 对 topic filter 的订阅关系，提供：
//!
//! * [`Subscription`]：订阅值对象，相等性只由 (client_id, topic filter) 决定
//! * [`TopicFilter`]：解析好的订阅 filter，支持 `+`/`#` 通配符匹配
//! * [`SubscriptionRegistry`]：订阅注册表，重新订阅是替换，并负责发布时的匹配
//! * [`resolver`]：把一个 topic 匹配到的订阅聚合成每个 client 一条投递 QoS
//!
//! 网络连接、报文编解码、消息投递由上层负责，本库只做纯计算

pub mod error;
pub mod registry;
pub mod resolver;
pub mod subscription;
pub mod topic;

pub use error::Error;
pub use registry::SubscriptionRegistry;
pub use resolver::resolve;
pub use subscription::{QoS, Subscription};
pub use topic::TopicFilter;
