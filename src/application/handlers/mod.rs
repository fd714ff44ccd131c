pub mod batch_dispatcher;
pub mod status_reconciler;
