// Backend module - Vulkan bootstrap layer
//
// Design: Thin wrapper around ash, fail-closed at every step
// Testing: Selection and negotiation run against the InstanceApi/DeviceApi
// traits, so they work without a GPU

pub mod api;
pub mod device;
pub mod enumerate;
pub mod error;
pub mod handle;
pub mod instance;
pub mod loader;
pub mod queue;
pub mod selector;
pub mod surface;
pub mod swapchain;
pub mod sync;

#[cfg(test)]
pub(crate) mod mock;

pub use api::{DeviceApi, InstanceApi};
pub use device::{LogicalDevice, LogicalDeviceContext, LogicalDeviceFactory};
pub use error::{BootstrapError, Result};
pub use handle::{DeviceHandle, DeviceStage, PresentState, Presentation};
pub use instance::InstanceContext;
pub use queue::QueueFamilyIndices;
pub use selector::DeviceSelector;
pub use surface::SurfaceBinding;
pub use swapchain::{Swapchain, SwapchainNegotiator, SwapchainParams, SwapchainStatus};
pub use sync::FrameSync;
