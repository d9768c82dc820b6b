pub mod db;
pub mod minio;
pub mod rabbitmq;
pub mod redis;
