pub mod block;
pub mod collaborators;

pub use block::{InvocationBlock, QueueAlgorithm};
pub use collaborators::{
    CacheStore, ConversionStrategy, EnvelopeError, HeaderListener, HeaderProvider,
    RequestCallback, Serializer, TimeTracker, Transport, TransportResponse, Validator,
};
