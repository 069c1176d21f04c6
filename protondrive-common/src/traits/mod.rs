pub mod observer_traits;
pub mod tool_traits;

pub use observer_traits::ControllerObserver;
pub use tool_traits::ToolInvoker;
