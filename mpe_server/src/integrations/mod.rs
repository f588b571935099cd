pub mod purchase_webhook;
pub mod zcash_rpc;
