// Capability tables at the instance and device scope
//
// Selection and negotiation only ever talk to these traits. `InstanceContext`
// and `LogicalDevice` implement them on top of ash; tests implement them in
// memory.

use super::error::Result;
use super::swapchain::SwapchainParams;
use ash::vk;
use std::ffi::CStr;

/// Everything the bootstrap needs from an instance.
pub trait InstanceApi {
    type Device: DeviceApi;

    fn enumerate_physical_devices(&self) -> Result<Vec<vk::PhysicalDevice>>;
    fn physical_device_properties(&self, physical_device: vk::PhysicalDevice) -> vk::PhysicalDeviceProperties;
    fn physical_device_features(&self, physical_device: vk::PhysicalDevice) -> vk::PhysicalDeviceFeatures;
    fn queue_family_properties(&self, physical_device: vk::PhysicalDevice) -> Result<Vec<vk::QueueFamilyProperties>>;
    fn device_extension_properties(&self, physical_device: vk::PhysicalDevice) -> Result<Vec<vk::ExtensionProperties>>;

    fn surface_support(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family: u32,
        surface: vk::SurfaceKHR,
    ) -> Result<bool>;
    fn surface_capabilities(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<vk::SurfaceCapabilitiesKHR>;
    fn surface_formats(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Vec<vk::SurfaceFormatKHR>>;
    fn surface_present_modes(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Vec<vk::PresentModeKHR>>;

    /// Create a device with one queue per listed family and exactly the
    /// listed extensions. The returned device has all device level functions
    /// resolved.
    fn create_device(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_families: &[u32],
        extensions: &[&CStr],
    ) -> Result<Self::Device>;

    fn destroy_surface(&self, surface: vk::SurfaceKHR);
}

/// Everything the bootstrap needs from a logical device.
pub trait DeviceApi {
    fn device_queue(&self, queue_family: u32, index: u32) -> vk::Queue;
    fn wait_idle(&self) -> Result<()>;

    fn create_semaphore(&self) -> Result<vk::Semaphore>;
    fn destroy_semaphore(&self, semaphore: vk::Semaphore);

    /// `old` is passed through to the driver so it can hand over resources;
    /// it stays owned (and alive) on the caller's side.
    fn create_swapchain(
        &self,
        surface: vk::SurfaceKHR,
        params: &SwapchainParams,
        queue_families: &[u32],
        old: vk::SwapchainKHR,
    ) -> Result<vk::SwapchainKHR>;
    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> Result<Vec<vk::Image>>;
    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR);

    fn destroy_device(&self);
}
