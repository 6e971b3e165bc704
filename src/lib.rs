// Vulkan bootstrap: instance, surface, device selection, logical device and
// swapchain negotiation behind a single DeviceHandle.

pub mod backend;
pub mod config;
