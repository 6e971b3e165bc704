// In-memory backend for tests
//
// Behaves like a driver with a fixed set of GPUs and one surface, and records
// every state-changing call in order.

use super::api::{DeviceApi, InstanceApi};
use super::error::{BootstrapError, Result};
use super::swapchain::{SurfaceSupport, SwapchainParams};
use ash::vk::{self, Handle};
use std::cell::{Cell, RefCell};
use std::ffi::{c_char, CStr};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateDevice { families: Vec<u32>, extensions: Vec<String> },
    WaitIdle,
    CreateSemaphore(u64),
    DestroySemaphore(u64),
    CreateSwapchain { handle: u64, old: u64 },
    DestroySwapchain(u64),
    DestroyDevice,
    DestroySurface(u64),
}

#[derive(Debug, Clone, Copy)]
pub struct MockFamily {
    pub graphics: bool,
    pub present: bool,
    pub queue_count: u32,
}

impl MockFamily {
    pub const NONE: Self = Self { graphics: false, present: false, queue_count: 1 };
    pub const GRAPHICS: Self = Self { graphics: true, present: false, queue_count: 1 };
    pub const PRESENT: Self = Self { graphics: false, present: true, queue_count: 1 };
    pub const BOTH: Self = Self { graphics: true, present: true, queue_count: 1 };
}

#[derive(Debug, Clone)]
pub struct MockGpu {
    name: &'static str,
    device_type: vk::PhysicalDeviceType,
    max_image_dimension: u32,
    geometry_shader: bool,
    families: Vec<MockFamily>,
    extensions: Vec<&'static CStr>,
}

impl MockGpu {
    fn new(name: &'static str, device_type: vk::PhysicalDeviceType) -> Self {
        Self {
            name,
            device_type,
            max_image_dimension: 16384,
            geometry_shader: true,
            families: vec![MockFamily::BOTH],
            extensions: vec![ash::extensions::khr::Swapchain::name()],
        }
    }

    pub fn discrete(name: &'static str) -> Self {
        Self::new(name, vk::PhysicalDeviceType::DISCRETE_GPU)
    }

    pub fn integrated(name: &'static str) -> Self {
        Self::new(name, vk::PhysicalDeviceType::INTEGRATED_GPU)
    }

    pub fn with_families(mut self, families: Vec<MockFamily>) -> Self {
        self.families = families;
        self
    }

    pub fn with_extensions(mut self, extensions: Vec<&'static CStr>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_max_image_dimension(mut self, max_image_dimension: u32) -> Self {
        self.max_image_dimension = max_image_dimension;
        self
    }

    pub fn without_geometry_shader(mut self) -> Self {
        self.geometry_shader = false;
        self
    }
}

fn write_name<const N: usize>(dst: &mut [c_char; N], name: &[u8]) {
    for (d, s) in dst.iter_mut().zip(name.iter().take(N - 1)) {
        *d = *s as c_char;
    }
}

pub fn default_support() -> SurfaceSupport {
    SurfaceSupport {
        capabilities: vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 3,
            current_extent: vk::Extent2D { width: 1024, height: 768 },
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D { width: 4096, height: 4096 },
            max_image_array_layers: 1,
            supported_transforms: vk::SurfaceTransformFlagsKHR::IDENTITY,
            current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
            supported_composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
            supported_usage_flags: vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST,
        },
        formats: vec![vk::SurfaceFormatKHR {
            format: vk::Format::B8G8R8A8_UNORM,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }],
        present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
    }
}

type CallLog = Rc<RefCell<Vec<Call>>>;

pub struct MockInstance {
    gpus: Vec<MockGpu>,
    support: RefCell<SurfaceSupport>,
    calls: CallLog,
    next_handle: Rc<Cell<u64>>,
    surface_queries: RefCell<Vec<u32>>,
    device_error: Cell<Option<vk::Result>>,
    swapchain_error: Rc<Cell<Option<vk::Result>>>,
}

impl MockInstance {
    pub fn new(gpus: Vec<MockGpu>) -> Self {
        Self {
            gpus,
            support: RefCell::new(default_support()),
            calls: Rc::default(),
            next_handle: Rc::new(Cell::new(100)),
            surface_queries: RefCell::default(),
            device_error: Cell::new(None),
            swapchain_error: Rc::default(),
        }
    }

    pub fn surface() -> vk::SurfaceKHR {
        vk::SurfaceKHR::from_raw(0x5)
    }

    pub fn physical_device(&self, index: usize) -> vk::PhysicalDevice {
        vk::PhysicalDevice::from_raw(index as u64 + 1)
    }

    fn gpu(&self, physical_device: vk::PhysicalDevice) -> &MockGpu {
        &self.gpus[(physical_device.as_raw() - 1) as usize]
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn surface_support_queries(&self) -> Vec<u32> {
        self.surface_queries.borrow().clone()
    }

    pub fn reject_device_creation(&self, result: vk::Result) {
        self.device_error.set(Some(result));
    }

    /// The next swapchain creation fails with `result`.
    pub fn reject_swapchain_creation(&self, result: vk::Result) {
        self.swapchain_error.set(Some(result));
    }

    pub fn set_current_extent(&self, extent: vk::Extent2D) {
        self.support.borrow_mut().capabilities.current_extent = extent;
    }

    pub fn set_present_modes(&self, present_modes: Vec<vk::PresentModeKHR>) {
        self.support.borrow_mut().present_modes = present_modes;
    }
}

impl InstanceApi for MockInstance {
    type Device = MockDevice;

    fn enumerate_physical_devices(&self) -> Result<Vec<vk::PhysicalDevice>> {
        if self.gpus.is_empty() {
            return Err(BootstrapError::EmptyEnumeration { what: "physical device" });
        }
        Ok((0..self.gpus.len()).map(|index| self.physical_device(index)).collect())
    }

    fn physical_device_properties(&self, physical_device: vk::PhysicalDevice) -> vk::PhysicalDeviceProperties {
        let gpu = self.gpu(physical_device);
        let mut props = vk::PhysicalDeviceProperties {
            device_type: gpu.device_type,
            ..Default::default()
        };
        props.limits.max_image_dimension2_d = gpu.max_image_dimension;
        write_name(&mut props.device_name, gpu.name.as_bytes());
        props
    }

    fn physical_device_features(&self, physical_device: vk::PhysicalDevice) -> vk::PhysicalDeviceFeatures {
        vk::PhysicalDeviceFeatures {
            geometry_shader: self.gpu(physical_device).geometry_shader.into(),
            ..Default::default()
        }
    }

    fn queue_family_properties(&self, physical_device: vk::PhysicalDevice) -> Result<Vec<vk::QueueFamilyProperties>> {
        let families = &self.gpu(physical_device).families;
        if families.is_empty() {
            return Err(BootstrapError::EmptyEnumeration { what: "queue family" });
        }
        Ok(families
            .iter()
            .map(|family| vk::QueueFamilyProperties {
                queue_flags: if family.graphics {
                    vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER
                } else {
                    vk::QueueFlags::TRANSFER
                },
                queue_count: family.queue_count,
                ..Default::default()
            })
            .collect())
    }

    fn device_extension_properties(&self, physical_device: vk::PhysicalDevice) -> Result<Vec<vk::ExtensionProperties>> {
        let extensions = &self.gpu(physical_device).extensions;
        if extensions.is_empty() {
            return Err(BootstrapError::EmptyEnumeration { what: "device extension" });
        }
        Ok(extensions
            .iter()
            .map(|name| {
                let mut props = vk::ExtensionProperties::default();
                write_name(&mut props.extension_name, name.to_bytes());
                props
            })
            .collect())
    }

    fn surface_support(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family: u32,
        _surface: vk::SurfaceKHR,
    ) -> Result<bool> {
        self.surface_queries.borrow_mut().push(queue_family);
        Ok(self.gpu(physical_device).families[queue_family as usize].present)
    }

    fn surface_capabilities(
        &self,
        _physical_device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> Result<vk::SurfaceCapabilitiesKHR> {
        Ok(self.support.borrow().capabilities)
    }

    fn surface_formats(
        &self,
        _physical_device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> Result<Vec<vk::SurfaceFormatKHR>> {
        Ok(self.support.borrow().formats.clone())
    }

    fn surface_present_modes(
        &self,
        _physical_device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> Result<Vec<vk::PresentModeKHR>> {
        Ok(self.support.borrow().present_modes.clone())
    }

    fn create_device(
        &self,
        _physical_device: vk::PhysicalDevice,
        queue_families: &[u32],
        extensions: &[&CStr],
    ) -> Result<MockDevice> {
        if let Some(result) = self.device_error.take() {
            return Err(BootstrapError::DeviceCreationFailed(result));
        }

        self.calls.borrow_mut().push(Call::CreateDevice {
            families: queue_families.to_vec(),
            extensions: extensions
                .iter()
                .map(|ext| ext.to_string_lossy().into_owned())
                .collect(),
        });

        Ok(MockDevice {
            calls: Rc::clone(&self.calls),
            next_handle: Rc::clone(&self.next_handle),
            swapchain_error: Rc::clone(&self.swapchain_error),
        })
    }

    fn destroy_surface(&self, surface: vk::SurfaceKHR) {
        self.calls.borrow_mut().push(Call::DestroySurface(surface.as_raw()));
    }
}

pub struct MockDevice {
    calls: CallLog,
    next_handle: Rc<Cell<u64>>,
    swapchain_error: Rc<Cell<Option<vk::Result>>>,
}

impl MockDevice {
    fn handle(&self) -> u64 {
        let handle = self.next_handle.get();
        self.next_handle.set(handle + 1);
        handle
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl DeviceApi for MockDevice {
    fn device_queue(&self, queue_family: u32, index: u32) -> vk::Queue {
        vk::Queue::from_raw(0x1000 + u64::from(queue_family) * 0x10 + u64::from(index))
    }

    fn wait_idle(&self) -> Result<()> {
        self.record(Call::WaitIdle);
        Ok(())
    }

    fn create_semaphore(&self) -> Result<vk::Semaphore> {
        let handle = self.handle();
        self.record(Call::CreateSemaphore(handle));
        Ok(vk::Semaphore::from_raw(handle))
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        self.record(Call::DestroySemaphore(semaphore.as_raw()));
    }

    fn create_swapchain(
        &self,
        _surface: vk::SurfaceKHR,
        _params: &SwapchainParams,
        _queue_families: &[u32],
        old: vk::SwapchainKHR,
    ) -> Result<vk::SwapchainKHR> {
        if let Some(result) = self.swapchain_error.take() {
            return Err(BootstrapError::SwapchainCreationFailed(result));
        }
        let handle = self.handle();
        self.record(Call::CreateSwapchain {
            handle,
            old: old.as_raw(),
        });
        Ok(vk::SwapchainKHR::from_raw(handle))
    }

    fn swapchain_images(&self, _swapchain: vk::SwapchainKHR) -> Result<Vec<vk::Image>> {
        Ok((0..3).map(|_| vk::Image::from_raw(self.handle())).collect())
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        self.record(Call::DestroySwapchain(swapchain.as_raw()));
    }

    fn destroy_device(&self) {
        self.record(Call::DestroyDevice);
    }
}
