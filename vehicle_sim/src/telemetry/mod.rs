pub mod stream;

pub use stream::run_stream;
