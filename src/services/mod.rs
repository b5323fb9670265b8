pub mod metadata_store;
pub mod naming;
pub mod storage_service;
