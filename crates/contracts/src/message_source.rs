//! MessageSource trait - transport subscription abstraction
//!
//! Decouples the point cloud adapter from the concrete transport. Live
//! transports, the mock generator and the replay reader all implement it.

use std::sync::Arc;

/// Message arrival callback.
///
/// Invoked synchronously on the source's delivery thread with the raw payload
/// and the channel it arrived on.
pub type MessageHandler = Arc<dyn Fn(&[u8], &str) + Send + Sync>;

/// Transport subscription for a single named channel.
///
/// # Example
///
/// ```ignore
/// let source: Box<dyn MessageSource> = open_source();
/// source.subscribe(Arc::new(|payload, channel| {
///     println!("{} bytes on {}", payload.len(), channel);
/// }));
/// // ...
/// source.stop();
/// ```
pub trait MessageSource: Send + Sync {
    /// Channel this source delivers
    fn channel(&self) -> &str;

    /// Register the arrival handler and start delivery.
    ///
    /// Calling again while already listening is a no-op; the first handler
    /// stays registered.
    fn subscribe(&self, handler: MessageHandler);

    /// Stop delivery
    fn stop(&self);

    /// Check if currently delivering
    fn is_listening(&self) -> bool;
}
