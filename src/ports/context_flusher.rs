use crate::error::UnsealResult;
use crate::model::Handle;

pub trait ContextFlusher {
    fn flush_context(&self, handle: Handle) -> UnsealResult<()>;
}
