//! Response compression layer.

use tower_http::compression::CompressionLayer;

/// Builds a compression layer (gzip). The default predicate leaves
/// `text/event-stream` responses uncompressed.
pub fn build_compression_layer() -> CompressionLayer {
    CompressionLayer::new()
}
