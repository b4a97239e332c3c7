pub mod device_registry;
pub mod hal_executor;
pub mod policy_delegate;
