pub mod client;
pub mod conf;
pub mod context;


pub use client::KafkaClient;
pub use conf::{validate_broker_list, KafkaConf};
pub use context::DeliveryContext;
