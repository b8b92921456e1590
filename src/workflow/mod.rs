pub mod entry_ctx;
pub mod entry_flow;

pub use entry_ctx::TaskCtx;
pub use entry_flow::EntrySubmitter;
