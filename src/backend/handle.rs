// Device handle - one façade over every bootstrap stage
//
// Calling code holds a DeviceHandle whatever has been built so far:
// a bare physical device, a logical device, or a device with a swapchain.
// Teardown order is fixed: swapchain -> semaphores -> logical device -> surface.
// The instance goes last, when the final Arc to it is dropped.

use super::api::{DeviceApi, InstanceApi};
use super::device::{LogicalDeviceContext, LogicalDeviceFactory};
use super::error::{BootstrapError, Result};
use super::queue::QueueFamilyIndices;
use super::selector::{device_name, DeviceSelector};
use super::surface::SurfaceBinding;
use super::swapchain::{Swapchain, SwapchainNegotiator, SwapchainStatus};
use super::sync::FrameSync;
use ash::vk;
use std::ffi::CStr;
use std::sync::Arc;

/// Swapchain plus the semaphores a frame loop uses with it.
#[derive(Debug)]
pub struct Presentation {
    pub sync: FrameSync,
    pub swapchain: Swapchain,
}

pub enum DeviceStage<D: DeviceApi> {
    PhysicalOnly(vk::PhysicalDevice),
    WithLogicalDevice(LogicalDeviceContext<D>),
    WithSwapchain(LogicalDeviceContext<D>, Presentation),
}

#[derive(Debug, Clone, Copy)]
pub enum PresentState {
    Ready,
    /// Zero-sized surface (e.g. minimized). Try again after the next resize.
    NotPresentable(vk::Extent2D),
}

pub struct DeviceHandle<I: InstanceApi> {
    instance: Arc<I>,
    surface: SurfaceBinding,
    negotiator: SwapchainNegotiator,
    stage: DeviceStage<I::Device>,
}

impl<I: InstanceApi> DeviceHandle<I> {
    pub fn new(
        instance: Arc<I>,
        surface: SurfaceBinding,
        physical_device: vk::PhysicalDevice,
        negotiator: SwapchainNegotiator,
    ) -> Self {
        Self {
            instance,
            surface,
            negotiator,
            stage: DeviceStage::PhysicalOnly(physical_device),
        }
    }

    /// Select a device for `surface`, create the logical device and the first
    /// swapchain. The surface is released if any step fails.
    ///
    /// A surface that is not presentable yet (minimized window) leaves the
    /// handle without a swapchain; `recreate_swapchain` creates it later.
    pub fn bootstrap(
        instance: Arc<I>,
        surface: SurfaceBinding,
        selector: &DeviceSelector,
        negotiator: SwapchainNegotiator,
    ) -> Result<Self> {
        let selected = selector
            .enumerate_candidates(&*instance)
            .and_then(|candidates| selector.select_best(&*instance, &candidates, surface.handle()));
        let physical_device = match selected {
            Ok(physical_device) => physical_device,
            Err(err) => {
                surface.destroy(&*instance);
                return Err(err);
            }
        };

        let mut handle = Self::new(instance, surface, physical_device, negotiator);

        let stages = handle
            .create_logical_device(&selector.required_extensions())
            .and_then(|()| handle.recreate_swapchain());
        match stages {
            Ok(PresentState::Ready) => Ok(handle),
            Ok(PresentState::NotPresentable(extent)) => {
                log::info!(
                    "Surface is {}x{}, swapchain creation deferred",
                    extent.width,
                    extent.height
                );
                Ok(handle)
            }
            Err(err) => {
                handle.destroy();
                Err(err)
            }
        }
    }

    pub fn stage(&self) -> &DeviceStage<I::Device> {
        &self.stage
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        match &self.stage {
            DeviceStage::PhysicalOnly(physical_device) => *physical_device,
            DeviceStage::WithLogicalDevice(context) | DeviceStage::WithSwapchain(context, _) => {
                context.physical_device
            }
        }
    }

    pub fn logical_device(&self) -> Option<&LogicalDeviceContext<I::Device>> {
        match &self.stage {
            DeviceStage::PhysicalOnly(_) => None,
            DeviceStage::WithLogicalDevice(context) | DeviceStage::WithSwapchain(context, _) => Some(context),
        }
    }

    pub fn presentation(&self) -> Option<&Presentation> {
        match &self.stage {
            DeviceStage::WithSwapchain(_, presentation) => Some(presentation),
            _ => None,
        }
    }

    pub fn surface(&self) -> vk::SurfaceKHR {
        self.surface.handle()
    }

    pub fn name(&self) -> String {
        device_name(&self.instance.physical_device_properties(self.physical_device()))
    }

    pub fn print_name(&self) {
        log::info!("Device name: {}", self.name());
    }

    /// Extent used when the surface leaves the choice to the application.
    pub fn set_fallback_extent(&mut self, extent: vk::Extent2D) {
        self.negotiator.set_fallback_extent(extent);
    }

    /// PhysicalOnly -> WithLogicalDevice. Later stages already have a device.
    pub fn create_logical_device(&mut self, required_extensions: &[&CStr]) -> Result<()> {
        let DeviceStage::PhysicalOnly(physical_device) = self.stage else {
            log::warn!("Logical device already exists, not creating another one");
            return Ok(());
        };

        let indices = QueueFamilyIndices::find(&*self.instance, physical_device, Some(self.surface.handle()))?;
        let context = LogicalDeviceFactory::create(&*self.instance, physical_device, indices, required_extensions)?;
        self.stage = DeviceStage::WithLogicalDevice(context);
        Ok(())
    }

    /// Create the first swapchain, or replace the current one.
    ///
    /// The current swapchain is passed into creation and destroyed only once
    /// its replacement exists. On error or `NotPresentable` it stays current.
    pub fn recreate_swapchain(&mut self) -> Result<PresentState> {
        let surface = self.surface.handle();

        let presentation = match &mut self.stage {
            DeviceStage::PhysicalOnly(_) => return Err(BootstrapError::NoLogicalDevice),
            DeviceStage::WithSwapchain(context, presentation) => {
                let status = self.negotiator.negotiate(
                    &*self.instance,
                    context,
                    surface,
                    Some(&presentation.swapchain),
                )?;
                return Ok(match status {
                    SwapchainStatus::Ready(next) => {
                        presentation.swapchain.replace_with(next, &context.device);
                        PresentState::Ready
                    }
                    SwapchainStatus::NotPresentable(extent) => PresentState::NotPresentable(extent),
                });
            }
            DeviceStage::WithLogicalDevice(context) => {
                let swapchain = match self.negotiator.negotiate(&*self.instance, context, surface, None)? {
                    SwapchainStatus::Ready(swapchain) => swapchain,
                    SwapchainStatus::NotPresentable(extent) => return Ok(PresentState::NotPresentable(extent)),
                };
                let sync = match FrameSync::new(&context.device) {
                    Ok(sync) => sync,
                    Err(err) => {
                        swapchain.destroy(&context.device);
                        return Err(err);
                    }
                };
                Presentation { sync, swapchain }
            }
        };

        let placeholder = DeviceStage::PhysicalOnly(self.physical_device());
        if let DeviceStage::WithLogicalDevice(context) = std::mem::replace(&mut self.stage, placeholder) {
            self.stage = DeviceStage::WithSwapchain(context, presentation);
        }
        Ok(PresentState::Ready)
    }

    /// Wait for the device to go idle, then release everything this handle
    /// owns in reverse order of creation.
    pub fn destroy(self) {
        let Self {
            instance,
            surface,
            stage,
            ..
        } = self;

        match stage {
            DeviceStage::PhysicalOnly(_) => {}
            DeviceStage::WithLogicalDevice(context) => {
                wait_before_teardown(&context);
                context.destroy();
            }
            DeviceStage::WithSwapchain(context, presentation) => {
                wait_before_teardown(&context);
                presentation.swapchain.destroy(&context.device);
                presentation.sync.destroy(&context.device);
                context.destroy();
            }
        }

        surface.destroy(&*instance);
        log::info!("Device destroyed.");
    }
}

fn wait_before_teardown<D: DeviceApi>(context: &LogicalDeviceContext<D>) {
    if let Err(err) = context.wait_idle() {
        log::warn!("Device did not go idle before teardown: {}", err);
    }
}
