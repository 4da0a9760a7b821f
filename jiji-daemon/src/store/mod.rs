//! Two surfaces into the same replicated store (spec.md §4.B): a
//! transactional writer over HTTP and a CLI-backed reader. Neither
//! retries.

mod reader;
mod transactional;

pub use reader::StoreReader;
pub use transactional::{TransactionResult, TransactionalWriter};

/// Convenience bundle of both store surfaces, passed to every reconciler
/// component.
#[derive(Clone)]
pub struct StoreClient {
    pub writer: TransactionalWriter,
    pub reader: StoreReader,
}

impl StoreClient {
    #[must_use]
    pub fn new(writer: TransactionalWriter, reader: StoreReader) -> Self {
        Self { writer, reader }
    }
}
