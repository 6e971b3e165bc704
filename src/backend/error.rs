// Bootstrap errors
//
// Two classes: fatal (violated API guarantees, nothing to fall back to) and
// recoverable (the caller may retry later, e.g. after a driver/device change).

use super::loader::Scope;
use ash::vk;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to load the Vulkan library: {0}")]
    LibraryLoad(String),

    #[error("could not resolve {scope} level function(s): {}", .names.join(", "))]
    MissingFunction { scope: Scope, names: Vec<String> },

    #[error("could not resolve device level function(s): {}", .0.join(", "))]
    MissingDeviceFunction(Vec<String>),

    #[error("instance extension \"{0}\" is not available")]
    MissingInstanceExtension(String),

    #[error("device extension \"{0}\" is not supported by the selected device")]
    MissingDeviceExtension(String),

    #[error("could not create Vulkan instance: {0}")]
    InstanceCreationFailed(vk::Result),

    #[error("could not create window surface: {0}")]
    SurfaceCreationFailed(vk::Result),

    #[error("error occurred during {what} enumeration: {result}")]
    EnumerationFailed { what: &'static str, result: vk::Result },

    #[error("{what} enumeration returned no entries")]
    EmptyEnumeration { what: &'static str },

    #[error("no Vulkan-capable devices found")]
    NoDevicesFound,

    #[error("no suitable device among the enumerated candidates")]
    NoSuitableDevice,

    #[error("queue families are incomplete (graphics: {graphics:?}, present: {present:?})")]
    IncompleteQueueFamilies {
        graphics: Option<u32>,
        present: Option<u32>,
    },

    #[error("failed to create logical device: {0}")]
    DeviceCreationFailed(vk::Result),

    #[error("swapchain images cannot be used as transfer destination (supported: {supported:?})")]
    UnsupportedSwapchainUsage { supported: vk::ImageUsageFlags },

    #[error("neither MAILBOX nor FIFO present mode is supported by the surface")]
    NoUsablePresentMode,

    #[error("surface reports no supported composite alpha mode")]
    NoCompositeAlpha,

    #[error("failed to create swapchain: {0}")]
    SwapchainCreationFailed(vk::Result),

    #[error("no logical device exists at this bootstrap stage")]
    NoLogicalDevice,

    #[error("{call} failed: {result}")]
    Vulkan { call: &'static str, result: vk::Result },
}

impl BootstrapError {
    /// Whether the caller can react (retry later, pick another adapter) instead
    /// of tearing everything down.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NoDevicesFound | Self::NoSuitableDevice)
    }

    pub(crate) fn vulkan(call: &'static str) -> impl FnOnce(vk::Result) -> Self {
        move |result| Self::Vulkan { call, result }
    }
}

pub type Result<T, E = BootstrapError> = std::result::Result<T, E>;
