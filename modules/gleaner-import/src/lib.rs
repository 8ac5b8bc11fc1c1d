pub mod extract;
pub mod loader;
pub mod memory;
pub mod pages;
pub mod pipeline;
pub mod task;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod unparsed;
pub mod validate;
