//! Model adapters and loading

pub mod adapter;
pub mod loader;
pub mod onnx;

pub use adapter::ModelAdapter;
pub use loader::ModelLoader;
pub use onnx::OnnxModel;
