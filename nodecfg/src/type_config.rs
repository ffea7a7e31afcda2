//! Define the collaborator types of an NCM instance.

use crate::codec::ConfigCodec;
use crate::store::ConfigStore;
use crate::tracer::ConfigTracer;
use crate::workers::WorkerPool;

/// Associated collaborator types of an NCM instance.
///
/// Bundling the injection points into one trait keeps signatures short and
/// lets tests wire the core to in-memory fakes without touching any I/O.
///
/// Example:
/// ```ignore
/// struct ServerTypes {}
/// impl NcmTypeConfig for ServerTypes {
///     type Codec = JsonCodec;
///     type Store = ZkConfigStore;
///     type Workers = ProcessorPool;
///     type Tracer = ScribeTracer;
/// }
/// ```
pub trait NcmTypeConfig: Sized + Send + Sync + 'static {
    /// Wire format of serialized configurations.
    type Codec: ConfigCodec;

    /// The backing compare-and-swap store.
    type Store: ConfigStore;

    /// Fan-out executor notifying worker contexts of publications.
    type Workers: WorkerPool;

    /// Sink for publication trace samples.
    type Tracer: ConfigTracer;
}
