// Function loader - fail-closed entry point resolution
//
// ash builds the actual function tables (Entry, Instance, Device). Before a
// table is handed out we resolve every entry point this crate calls at that
// scope, so no call site can ever hit an unresolved stub.

use super::error::{BootstrapError, Result};
use ash::vk;
use std::ffi::CStr;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Exported by the loader library itself (`vkGetInstanceProcAddr`).
    Export,
    /// Resolved with a null instance.
    Global,
    Instance,
    Device,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Scope::Export => "exported",
            Scope::Global => "global",
            Scope::Instance => "instance",
            Scope::Device => "device",
        })
    }
}

pub const EXPORTED_FUNCTIONS: &[&CStr] = &[c"vkGetInstanceProcAddr"];

pub const GLOBAL_FUNCTIONS: &[&CStr] = &[
    c"vkCreateInstance",
    c"vkEnumerateInstanceExtensionProperties",
];

pub const INSTANCE_FUNCTIONS: &[&CStr] = &[
    c"vkEnumeratePhysicalDevices",
    c"vkGetPhysicalDeviceProperties",
    c"vkGetPhysicalDeviceFeatures",
    c"vkGetPhysicalDeviceQueueFamilyProperties",
    c"vkEnumerateDeviceExtensionProperties",
    c"vkCreateDevice",
    c"vkGetDeviceProcAddr",
    c"vkDestroyInstance",
    // VK_KHR_surface
    c"vkGetPhysicalDeviceSurfaceSupportKHR",
    c"vkGetPhysicalDeviceSurfaceCapabilitiesKHR",
    c"vkGetPhysicalDeviceSurfaceFormatsKHR",
    c"vkGetPhysicalDeviceSurfacePresentModesKHR",
    c"vkDestroySurfaceKHR",
];

pub const DEVICE_FUNCTIONS: &[&CStr] = &[
    c"vkGetDeviceQueue",
    c"vkDeviceWaitIdle",
    c"vkDestroyDevice",
    c"vkCreateSemaphore",
    c"vkDestroySemaphore",
    // VK_KHR_swapchain
    c"vkCreateSwapchainKHR",
    c"vkGetSwapchainImagesKHR",
    c"vkAcquireNextImageKHR",
    c"vkQueuePresentKHR",
    c"vkDestroySwapchainKHR",
];

/// Resolve every name in `names`, failing with the complete list of misses.
pub fn verify<F>(scope: Scope, names: &[&CStr], mut resolve: F) -> Result<()>
where
    F: FnMut(&CStr) -> vk::PFN_vkVoidFunction,
{
    let missing: Vec<String> = names
        .iter()
        .filter(|name| resolve(name).is_none())
        .map(|name| name.to_string_lossy().into_owned())
        .collect();

    if missing.is_empty() {
        log::debug!("Resolved {} {} level functions", names.len(), scope);
        return Ok(());
    }

    for name in &missing {
        log::error!("Could not load {} level function: {}!", scope, name);
    }

    Err(match scope {
        Scope::Device => BootstrapError::MissingDeviceFunction(missing),
        _ => BootstrapError::MissingFunction { scope, names: missing },
    })
}
